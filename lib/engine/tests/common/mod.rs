#![allow(dead_code)]

use serde_json::{json, Value};
use sparql_proxy_engine::{SparqlClient, SPARQL_RESULTS_JSON};
use sparql_proxy_query::PreparedQuery;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub fn client(server: &MockServer) -> SparqlClient {
    client_with_timeout(server, Duration::from_secs(5))
}

pub fn client_with_timeout(server: &MockServer, timeout: Duration) -> SparqlClient {
    let endpoint = Url::parse(&format!("{}/sparql", server.uri())).unwrap();
    SparqlClient::new(endpoint, timeout).unwrap()
}

/// The `query` form field of a request received by the mock backend.
pub fn sent_query(request: &Request) -> String {
    url::form_urlencoded::parse(&request.body)
        .find(|(name, _)| name == "query")
        .map(|(_, value)| value.into_owned())
        .unwrap()
}

pub fn accept_of(request: &Request) -> Option<String> {
    request
        .headers
        .get("accept")
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

pub async fn sent_queries(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(sent_query)
        .collect()
}

/// The result document of the single triple `<http://example.com> dc:title "Hello, world!"`.
pub fn hello_world_results() -> Value {
    json!({
        "head": { "vars": ["s", "p", "o"] },
        "results": {
            "bindings": [{
                "s": { "type": "uri", "value": "http://example.com" },
                "p": { "type": "uri", "value": "http://purl.org/dc/terms/title" },
                "o": { "type": "literal", "value": "Hello, world!" }
            }]
        }
    })
}

pub async fn mount_results(server: &MockServer, results: &Value) {
    Mock::given(method("POST"))
        .and(path("/sparql"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(results.to_string(), SPARQL_RESULTS_JSON),
        )
        .mount(server)
        .await;
}

/// A backend holding `rows` solutions of `?x`. It honors the `OFFSET`/`LIMIT` window of the
/// queries it receives.
pub struct Dataset {
    pub rows: usize,
}

impl Respond for Dataset {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let query = PreparedQuery::parse(&sent_query(request)).unwrap();
        let start = query.offset().min(self.rows);
        let end = query
            .limit()
            .map_or(self.rows, |limit| start.saturating_add(limit))
            .min(self.rows);
        let bindings = (start..end)
            .map(|row| json!({ "x": { "type": "literal", "value": row.to_string() } }))
            .collect::<Vec<_>>();
        let body = json!({ "head": { "vars": ["x"] }, "results": { "bindings": bindings } });
        ResponseTemplate::new(200).set_body_raw(body.to_string(), SPARQL_RESULTS_JSON)
    }
}

pub async fn mount_dataset(server: &MockServer, rows: usize) {
    Mock::given(method("POST"))
        .and(path("/sparql"))
        .respond_with(Dataset { rows })
        .mount(server)
        .await;
}

pub fn row_values(body: &str) -> Vec<String> {
    let document: Value = serde_json::from_str(body).unwrap();
    document["results"]["bindings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|binding| binding["x"]["value"].as_str().unwrap().to_owned())
        .collect()
}
