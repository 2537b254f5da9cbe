use crate::{BackendResponse, JobError, SPARQL_RESULTS_JSON};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct SolutionsDocument {
    head: Value,
    results: Solutions,
}

#[derive(Deserialize)]
struct Solutions {
    bindings: Vec<Value>,
}

/// Concatenates the bindings of the SPARQL JSON documents returned for the chunks of a split
/// query. The `head`, content type and headers of the first chunk are kept.
#[derive(Debug, Default)]
pub(crate) struct SolutionsMerger {
    head: Option<Value>,
    content_type: Option<String>,
    headers: HeaderMap,
    bindings: Vec<Value>,
}

impl SolutionsMerger {
    /// Appends the bindings of `chunk` and returns how many rows it contained.
    pub(crate) fn push(&mut self, chunk: BackendResponse) -> Result<usize, JobError> {
        let document: SolutionsDocument = serde_json::from_str(&chunk.body)?;
        let rows = document.results.bindings.len();
        if self.head.is_none() {
            self.head = Some(document.head);
            self.content_type = Some(chunk.content_type);
            self.headers = chunk.headers;
        }
        self.bindings.extend(document.results.bindings);
        Ok(rows)
    }

    pub(crate) fn finish(self) -> BackendResponse {
        let document = json!({
            "head": self.head.unwrap_or_else(|| json!({ "vars": [] })),
            "results": { "bindings": self.bindings },
        });
        BackendResponse {
            content_type: self
                .content_type
                .filter(|content_type| !content_type.is_empty())
                .unwrap_or_else(|| SPARQL_RESULTS_JSON.to_owned()),
            body: document.to_string(),
            headers: self.headers,
        }
    }
}
