use spargebra::SparqlSyntaxError;

/// An error raised while preparing a query for execution.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The query text could not be parsed.
    #[error("Query parse failed: {cause}")]
    Parse {
        /// The raw query text, including the preamble.
        query: String,
        /// The parser error.
        #[source]
        cause: SparqlSyntaxError,
    },
    /// The text is valid SPARQL but not of an allowed top-level type (e.g. an update).
    #[error("Query type not allowed: {kind}")]
    UnsupportedType {
        /// The top-level type that was found.
        kind: String,
    },
}
