use crate::blank_nodes::BlankNodeCanonicalizer;
use crate::preamble::split_preamble;
use crate::QueryError;
use spargebra::algebra::GraphPattern;
use spargebra::{Query, Update};
use std::fmt;

/// The SPARQL query form of a [`PreparedQuery`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Select,
    Construct,
    Ask,
    Describe,
}

impl QueryKind {
    pub fn of(query: &Query) -> Self {
        match query {
            Query::Select { .. } => Self::Select,
            Query::Construct { .. } => Self::Construct,
            Query::Ask { .. } => Self::Ask,
            Query::Describe { .. } => Self::Describe,
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "SELECT",
            Self::Construct => "CONSTRUCT",
            Self::Ask => "ASK",
            Self::Describe => "DESCRIBE",
        })
    }
}

/// A parsed query together with the preamble that preceded it.
///
/// Regenerating the text from the parsed form removes every cosmetic difference (whitespace,
/// prefixed names, blank node labels), hence [`Self::canonical_text`] is stable across
/// spellings of the same query.
#[derive(Clone, Debug)]
pub struct PreparedQuery {
    preamble: String,
    query: Query,
}

impl PreparedQuery {
    /// Parses `raw`, which may start with a preamble of `define` directives.
    ///
    /// Text that parses as a SPARQL update is rejected with [`QueryError::UnsupportedType`].
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let (preamble, body) = split_preamble(raw);
        let mut query = match Query::parse(body, None) {
            Ok(query) => query,
            Err(cause) => {
                if Update::parse(body, None).is_ok() {
                    return Err(QueryError::UnsupportedType {
                        kind: "update".to_owned(),
                    });
                }
                return Err(QueryError::Parse {
                    query: raw.to_owned(),
                    cause,
                });
            }
        };
        BlankNodeCanonicalizer::canonicalize(&mut query);
        Ok(Self {
            preamble: preamble.to_owned(),
            query,
        })
    }

    /// Reassembles a query from a preamble and an already parsed (possibly rewritten) query.
    pub fn from_parts(preamble: impl Into<String>, mut query: Query) -> Self {
        BlankNodeCanonicalizer::canonicalize(&mut query);
        Self {
            preamble: preamble.into(),
            query,
        }
    }

    pub fn into_parts(self) -> (String, Query) {
        (self.preamble, self.query)
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn kind(&self) -> QueryKind {
        QueryKind::of(&self.query)
    }

    /// The `LIMIT` declared by the query, if any.
    pub fn limit(&self) -> Option<usize> {
        outermost_slice(pattern(&self.query)).and_then(|(_, length)| length)
    }

    /// The `OFFSET` declared by the query, `0` if none.
    pub fn offset(&self) -> usize {
        outermost_slice(pattern(&self.query)).map_or(0, |(start, _)| start)
    }

    /// The preamble followed by the regenerated query.
    pub fn canonical_text(&self) -> String {
        format!("{}{}", self.preamble, self.query)
    }

    /// The canonical text with the solution window replaced by `OFFSET start LIMIT length`.
    pub fn text_with_window(&self, start: usize, length: Option<usize>) -> String {
        let mut query = self.query.clone();
        let pattern = pattern_mut(&mut query);
        let empty = GraphPattern::Bgp {
            patterns: Vec::new(),
        };
        let inner = match std::mem::replace(pattern, empty) {
            GraphPattern::Slice { inner, .. } => inner,
            other => Box::new(other),
        };
        *pattern = if start == 0 && length.is_none() {
            *inner
        } else {
            GraphPattern::Slice {
                inner,
                start,
                length,
            }
        };
        format!("{}{}", self.preamble, query)
    }
}

fn pattern(query: &Query) -> &GraphPattern {
    match query {
        Query::Select { pattern, .. }
        | Query::Construct { pattern, .. }
        | Query::Ask { pattern, .. }
        | Query::Describe { pattern, .. } => pattern,
    }
}

fn pattern_mut(query: &mut Query) -> &mut GraphPattern {
    match query {
        Query::Select { pattern, .. }
        | Query::Construct { pattern, .. }
        | Query::Ask { pattern, .. }
        | Query::Describe { pattern, .. } => pattern,
    }
}

fn outermost_slice(pattern: &GraphPattern) -> Option<(usize, Option<usize>)> {
    match pattern {
        GraphPattern::Slice { start, length, .. } => Some((*start, *length)),
        _ => None,
    }
}
