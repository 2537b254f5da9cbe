use spargebra::algebra::{AggregateExpression, Expression, GraphPattern, OrderExpression};
use spargebra::term::{BlankNode, TermPattern, TriplePattern};
use spargebra::Query;
use std::collections::HashMap;

/// Relabels every blank node of a parsed query as `b0`, `b1`, ... in order of first
/// appearance.
///
/// The parser hands out fresh random identifiers for anonymous blank nodes, hence without this
/// step the same query text would regenerate differently on every parse.
#[derive(Debug, Default)]
pub(crate) struct BlankNodeCanonicalizer {
    labels: HashMap<BlankNode, BlankNode>,
}

impl BlankNodeCanonicalizer {
    pub(crate) fn canonicalize(query: &mut Query) {
        let mut canonicalizer = Self::default();
        match query {
            Query::Construct {
                template, pattern, ..
            } => {
                // The WHERE clause is visited first so that shared labels are numbered the
                // same way regardless of how the template is spelled.
                canonicalizer.graph_pattern(pattern);
                for triple in template {
                    canonicalizer.triple(triple);
                }
            }
            Query::Select { pattern, .. }
            | Query::Ask { pattern, .. }
            | Query::Describe { pattern, .. } => canonicalizer.graph_pattern(pattern),
        }
    }

    fn label(&mut self, node: &BlankNode) -> BlankNode {
        let next = self.labels.len();
        self.labels
            .entry(node.clone())
            .or_insert_with(|| BlankNode::new_unchecked(format!("b{next}")))
            .clone()
    }

    fn term(&mut self, term: &mut TermPattern) {
        if let TermPattern::BlankNode(node) = term {
            *node = self.label(node);
        }
    }

    fn triple(&mut self, triple: &mut TriplePattern) {
        self.term(&mut triple.subject);
        self.term(&mut triple.object);
    }

    fn graph_pattern(&mut self, pattern: &mut GraphPattern) {
        match pattern {
            GraphPattern::Bgp { patterns } => {
                for triple in patterns {
                    self.triple(triple);
                }
            }
            GraphPattern::Path {
                subject, object, ..
            } => {
                self.term(subject);
                self.term(object);
            }
            GraphPattern::Join { left, right }
            | GraphPattern::Union { left, right }
            | GraphPattern::Minus { left, right } => {
                self.graph_pattern(left);
                self.graph_pattern(right);
            }
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => {
                self.graph_pattern(left);
                self.graph_pattern(right);
                if let Some(expression) = expression {
                    self.expression(expression);
                }
            }
            GraphPattern::Filter { expr, inner } => {
                self.graph_pattern(inner);
                self.expression(expr);
            }
            GraphPattern::Extend {
                inner, expression, ..
            } => {
                self.graph_pattern(inner);
                self.expression(expression);
            }
            GraphPattern::OrderBy { inner, expression } => {
                self.graph_pattern(inner);
                for order in expression {
                    match order {
                        OrderExpression::Asc(e) | OrderExpression::Desc(e) => {
                            self.expression(e);
                        }
                    }
                }
            }
            GraphPattern::Graph { inner, .. }
            | GraphPattern::Project { inner, .. }
            | GraphPattern::Distinct { inner }
            | GraphPattern::Reduced { inner }
            | GraphPattern::Slice { inner, .. }
            | GraphPattern::Service { inner, .. } => self.graph_pattern(inner),
            GraphPattern::Group {
                inner, aggregates, ..
            } => {
                self.graph_pattern(inner);
                for (_, aggregate) in aggregates {
                    if let AggregateExpression::FunctionCall { expr, .. } = aggregate {
                        self.expression(expr);
                    }
                }
            }
            // VALUES rows only hold ground terms.
            GraphPattern::Values { .. } => {}
        }
    }

    fn expression(&mut self, expression: &mut Expression) {
        match expression {
            Expression::Or(a, b)
            | Expression::And(a, b)
            | Expression::Equal(a, b)
            | Expression::SameTerm(a, b)
            | Expression::Greater(a, b)
            | Expression::GreaterOrEqual(a, b)
            | Expression::Less(a, b)
            | Expression::LessOrEqual(a, b)
            | Expression::Add(a, b)
            | Expression::Subtract(a, b)
            | Expression::Multiply(a, b)
            | Expression::Divide(a, b) => {
                self.expression(a);
                self.expression(b);
            }
            Expression::In(a, list) => {
                self.expression(a);
                for e in list {
                    self.expression(e);
                }
            }
            Expression::UnaryPlus(a) | Expression::UnaryMinus(a) | Expression::Not(a) => {
                self.expression(a);
            }
            Expression::Exists(pattern) => self.graph_pattern(pattern),
            Expression::If(a, b, c) => {
                self.expression(a);
                self.expression(b);
                self.expression(c);
            }
            Expression::Coalesce(list) | Expression::FunctionCall(_, list) => {
                for e in list {
                    self.expression(e);
                }
            }
            _ => {}
        }
    }
}
