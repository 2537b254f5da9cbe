mod common;

use async_trait::async_trait;
use common::{
    accept_of, client, client_with_timeout, hello_world_results, mount_dataset, mount_results,
    row_values, sent_queries, sent_query, Dataset,
};
use reqwest::header::HeaderValue;
use serde_json::json;
use sparql_proxy_cache::store::MemoryStore;
use sparql_proxy_cache::{Cache, Compressor};
use sparql_proxy_engine::plugin::Next;
use sparql_proxy_engine::{
    BackendResponse, CompletionReason, Job, JobError, JobSettings, Plugin, PluginChain,
    QueryContext, QueryHook, Requester, SPARQL_RESULTS_JSON,
};
use sparql_proxy_query::spargebra::algebra::GraphPattern;
use sparql_proxy_query::spargebra::term::{NamedNode, NamedNodePattern};
use sparql_proxy_query::spargebra::Query;
use sparql_proxy_query::{Limits, PreparedQuery};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn requester(accept: &str) -> Requester {
    Requester {
        ip: "192.0.2.1".to_owned(),
        accept: accept.to_owned(),
    }
}

fn settings(max_limit: usize, max_chunk_limit: usize, splitting: bool) -> JobSettings {
    JobSettings {
        limits: Limits {
            max_limit,
            max_chunk_limit,
        },
        splitting,
    }
}

fn prepared_job(server: &MockServer, query: &str, settings: JobSettings, accept: &str) -> Job {
    Job::prepared(
        client(server),
        PluginChain::default(),
        settings,
        query,
        PreparedQuery::parse(query).unwrap(),
        requester(accept),
    )
}

/// Moves predicate IRIs of the query from one namespace to another and maps the IRIs of the
/// results back.
struct ReplacePrefix {
    from: &'static str,
    to: &'static str,
}

fn replace_predicates(pattern: &mut GraphPattern, from: &str, to: &str) {
    match pattern {
        GraphPattern::Bgp { patterns } => {
            for triple in patterns {
                if let NamedNodePattern::NamedNode(node) = &mut triple.predicate {
                    if let Some(rest) = node.as_str().strip_prefix(from) {
                        *node = NamedNode::new_unchecked(format!("{to}{rest}"));
                    }
                }
            }
        }
        GraphPattern::Project { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Slice { inner, .. } => replace_predicates(inner, from, to),
        _ => {}
    }
}

#[async_trait]
impl QueryHook for ReplacePrefix {
    async fn call(
        &self,
        mut context: QueryContext,
        next: Next<'_>,
    ) -> Result<BackendResponse, JobError> {
        if let Query::Select { pattern, .. } = &mut context.query {
            replace_predicates(pattern, self.from, self.to);
        }
        let mut response = next.run(context).await?;
        response.body = response.body.replace(self.to, self.from);
        response
            .headers
            .insert("x-replaced-prefix", HeaderValue::from_static(self.to));
        Ok(response)
    }
}

/// Serves the dataset, but stalls every chunk after the first one.
struct StallAfterFirstChunk(Dataset);

impl Respond for StallAfterFirstChunk {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let response = self.0.respond(request);
        if PreparedQuery::parse(&sent_query(request)).unwrap().offset() == 0 {
            response
        } else {
            response.set_delay(Duration::from_secs(30))
        }
    }
}

#[tokio::test]
async fn select_limit_is_capped() {
    let server = MockServer::start().await;
    mount_results(&server, &hello_world_results()).await;

    let job = prepared_job(
        &server,
        "SELECT * WHERE { ?s ?p ?o } LIMIT 50000",
        settings(10_000, 1_000, false),
        SPARQL_RESULTS_JSON,
    );
    job.run().await.unwrap();

    let sent = sent_queries(&server).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(PreparedQuery::parse(&sent[0]).unwrap().limit(), Some(10_000));
    assert_eq!(job.reason(), Some(CompletionReason::Success));
}

#[tokio::test]
async fn select_without_limit_gets_the_ceiling() {
    let server = MockServer::start().await;
    mount_results(&server, &hello_world_results()).await;

    let job = prepared_job(
        &server,
        "SELECT * WHERE { ?s ?p ?o } OFFSET 5",
        settings(100, 10, false),
        SPARQL_RESULTS_JSON,
    );
    job.run().await.unwrap();

    let sent = PreparedQuery::parse(&sent_queries(&server).await[0]).unwrap();
    assert_eq!(sent.limit(), Some(100));
    assert_eq!(sent.offset(), 5);
}

#[tokio::test]
async fn construct_is_sent_without_limit_and_with_client_accept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("", "text/turtle"))
        .expect(1)
        .mount(&server)
        .await;

    let job = prepared_job(
        &server,
        "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }",
        settings(10, 2, true),
        "text/turtle",
    );
    let response = job.run().await.unwrap();
    assert_eq!(response.content_type, "text/turtle");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(accept_of(&requests[0]).as_deref(), Some("text/turtle"));
    let sent = PreparedQuery::parse(&common::sent_query(&requests[0])).unwrap();
    assert_eq!(sent.limit(), None);
}

#[tokio::test]
async fn select_hooks_rewrite_what_the_backend_receives() {
    let server = MockServer::start().await;
    let mut results = hello_world_results();
    results["results"]["bindings"][0]["p"]["value"] = json!("http://example.org/terms/title");
    mount_results(&server, &results).await;
    let query = "SELECT * WHERE { ?s <http://purl.org/dc/terms/title> ?o }";

    let job = Job::prepared(
        client(&server),
        PluginChain::new(vec![Plugin::new("replace-prefix").on_select(ReplacePrefix {
            from: "http://purl.org/dc/terms/",
            to: "http://example.org/terms/",
        })]),
        settings(10, 10, false),
        query,
        PreparedQuery::parse(query).unwrap(),
        requester(SPARQL_RESULTS_JSON),
    );
    let response = job.run().await.unwrap();

    let sent = &sent_queries(&server).await[0];
    assert!(sent.contains("<http://example.org/terms/title>"));
    assert!(!sent.contains("purl.org"));
    assert!(response.body.contains("http://purl.org/dc/terms/title"));
    assert_eq!(
        response.headers["x-replaced-prefix"],
        "http://example.org/terms/"
    );
    assert_eq!(job.reason(), Some(CompletionReason::Success));
}

#[tokio::test]
async fn backend_headers_are_carried_on_the_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-served-by", "virtuoso")
                .set_body_raw(hello_world_results().to_string(), SPARQL_RESULTS_JSON),
        )
        .mount(&server)
        .await;

    let response = prepared_job(
        &server,
        "SELECT * WHERE { ?s ?p ?o }",
        settings(10, 10, false),
        SPARQL_RESULTS_JSON,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(response.headers["x-served-by"], "virtuoso");
    assert!(!response.headers.contains_key("content-length"));
    assert!(!response.headers.contains_key("content-type"));
}

#[tokio::test]
async fn passthrough_sends_text_verbatim() {
    let server = MockServer::start().await;
    mount_results(&server, &hello_world_results()).await;
    let raw = "define sql:select-option \"order\"\nSELECT   * { ?s ?p ?o }";

    let job = Job::passthrough(client(&server), raw, requester(SPARQL_RESULTS_JSON));
    job.run().await.unwrap();

    assert_eq!(sent_queries(&server).await, [raw]);
}

#[tokio::test]
async fn preamble_is_kept_in_front_of_the_query() {
    let server = MockServer::start().await;
    mount_results(&server, &hello_world_results()).await;
    let raw = "define sql:select-option \"order\"\nSELECT * { ?s ?p ?o }";

    prepared_job(&server, raw, settings(10, 10, false), SPARQL_RESULTS_JSON)
        .run()
        .await
        .unwrap();

    let sent = &sent_queries(&server).await[0];
    assert!(sent.starts_with("define sql:select-option \"order\"\n"));
}

#[tokio::test]
async fn split_stops_on_short_chunk() {
    let server = MockServer::start().await;
    mount_dataset(&server, 7).await;

    let job = prepared_job(
        &server,
        "SELECT ?x WHERE { ?x ?p ?o }",
        settings(10, 3, true),
        "text/csv",
    );
    let response = job.run().await.unwrap();

    assert_eq!(response.content_type, SPARQL_RESULTS_JSON);
    assert_eq!(row_values(&response.body), ["0", "1", "2", "3", "4", "5", "6"]);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert_eq!(accept_of(request).as_deref(), Some(SPARQL_RESULTS_JSON));
    }
}

#[tokio::test]
async fn split_never_exceeds_the_limit() {
    let server = MockServer::start().await;
    mount_dataset(&server, 100).await;

    let job = prepared_job(
        &server,
        "SELECT ?x WHERE { ?x ?p ?o } LIMIT 10",
        settings(10_000, 3, true),
        SPARQL_RESULTS_JSON,
    );
    let response = job.run().await.unwrap();

    assert_eq!(row_values(&response.body).len(), 10);
    let windows = sent_queries(&server)
        .await
        .iter()
        .map(|query| {
            let query = PreparedQuery::parse(query).unwrap();
            (query.offset(), query.limit())
        })
        .collect::<Vec<_>>();
    assert_eq!(
        windows,
        [(0, Some(3)), (3, Some(3)), (6, Some(3)), (9, Some(1))]
    );
}

#[tokio::test]
async fn split_window_starts_at_declared_offset() {
    let server = MockServer::start().await;
    mount_dataset(&server, 100).await;

    let job = prepared_job(
        &server,
        "SELECT ?x WHERE { ?x ?p ?o } OFFSET 40 LIMIT 5",
        settings(10_000, 4, true),
        SPARQL_RESULTS_JSON,
    );
    let response = job.run().await.unwrap();

    assert_eq!(row_values(&response.body), ["40", "41", "42", "43", "44"]);
    assert_eq!(sent_queries(&server).await.len(), 2);
}

#[tokio::test]
async fn backend_errors_are_passed_on() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_raw("Virtuoso 42000 Error", "text/plain"),
        )
        .mount(&server)
        .await;

    let job = prepared_job(
        &server,
        "ASK { ?s ?p ?o }",
        settings(10, 10, false),
        SPARQL_RESULTS_JSON,
    );
    let error = job.run().await.unwrap_err();

    match error {
        JobError::Backend { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "Virtuoso 42000 Error");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(job.reason(), Some(CompletionReason::Error));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let job = Job::prepared(
        client_with_timeout(&server, Duration::from_millis(100)),
        PluginChain::default(),
        settings(10, 10, false),
        "ASK { ?s ?p ?o }",
        PreparedQuery::parse("ASK { ?s ?p ?o }").unwrap(),
        requester(SPARQL_RESULTS_JSON),
    );

    assert!(matches!(job.run().await, Err(JobError::Timeout)));
    assert_eq!(job.reason(), Some(CompletionReason::Timeout));
}

#[tokio::test]
async fn cancel_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let job = Arc::new(prepared_job(
        &server,
        "SELECT * WHERE { ?s ?p ?o }",
        settings(10, 10, false),
        SPARQL_RESULTS_JSON,
    ));
    let running = tokio::spawn({
        let job = Arc::clone(&job);
        async move { job.run().await }
    });

    while server.received_requests().await.unwrap().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    job.cancel();

    let result = timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(JobError::Canceled)));
    assert_eq!(job.reason(), Some(CompletionReason::Canceled));
}

#[tokio::test]
async fn cancel_between_chunks_stops_the_split() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sparql"))
        .respond_with(StallAfterFirstChunk(Dataset { rows: 10 }))
        .expect(2)
        .mount(&server)
        .await;

    let job = Arc::new(prepared_job(
        &server,
        "SELECT ?x WHERE { ?x ?p ?o }",
        settings(10, 3, true),
        SPARQL_RESULTS_JSON,
    ));
    let running = tokio::spawn({
        let job = Arc::clone(&job);
        async move { job.run().await }
    });

    while server.received_requests().await.unwrap().len() < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    job.cancel();

    let result = timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(JobError::Canceled)));
    assert_eq!(job.reason(), Some(CompletionReason::Canceled));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let offsets = sent_queries(&server)
        .await
        .iter()
        .map(|query| PreparedQuery::parse(query).unwrap().offset())
        .collect::<Vec<_>>();
    assert_eq!(offsets, [0, 3]);
}

#[tokio::test]
async fn canceled_job_never_contacts_backend() {
    let server = MockServer::start().await;
    mount_results(&server, &hello_world_results()).await;

    let job = prepared_job(
        &server,
        "SELECT * WHERE { ?s ?p ?o }",
        settings(10, 10, false),
        SPARQL_RESULTS_JSON,
    );
    job.cancel();
    assert_eq!(job.reason(), Some(CompletionReason::Canceled));

    assert!(matches!(job.run().await, Err(JobError::Canceled)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn successful_results_are_cached() {
    let server = MockServer::start().await;
    mount_results(&server, &hello_world_results()).await;
    let cache = Cache::new(Arc::new(MemoryStore::new(10)), Compressor::Snappy);

    let job = prepared_job(
        &server,
        "SELECT * WHERE { ?s ?p ?o }",
        settings(10, 10, false),
        SPARQL_RESULTS_JSON,
    )
    .with_cache(cache.clone(), "key.snappy");
    let response = job.run().await.unwrap();

    let entry = cache.get("key.snappy").await.unwrap();
    assert_eq!(entry.body, response.body);
    assert_eq!(entry.content_type, SPARQL_RESULTS_JSON);
}

#[tokio::test]
async fn failed_results_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let cache = Cache::new(Arc::new(MemoryStore::new(10)), Compressor::Raw);

    let job = prepared_job(
        &server,
        "SELECT * WHERE { ?s ?p ?o }",
        settings(10, 10, false),
        SPARQL_RESULTS_JSON,
    )
    .with_cache(cache.clone(), "key.raw");
    assert!(job.run().await.is_err());
    assert!(cache.get("key.raw").await.is_none());
}
