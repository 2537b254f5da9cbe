use crate::JobError;
use reqwest::header::{
    HeaderMap, HeaderName, ACCEPT, CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE,
    TRANSFER_ENCODING,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

/// The media type of SPARQL JSON query results.
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Backend headers that describe the transfer rather than the results. The body is decoded
/// and may be rewritten, so they are not kept.
const TRANSFER_HEADERS: [HeaderName; 4] =
    [CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING];

/// A successful backend answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendResponse {
    pub content_type: String,
    pub body: String,
    /// The remaining headers sent by the backend. Hooks may read and rewrite them.
    pub headers: HeaderMap,
}

impl BackendResponse {
    pub fn new(content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
            headers: HeaderMap::new(),
        }
    }
}

/// An answer of the backend that is relayed as is, whatever its status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub headers: HeaderMap,
}

/// An HTTP client for the SPARQL endpoint that is being protected.
#[derive(Clone, Debug)]
pub struct SparqlClient {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl SparqlClient {
    /// Creates a client for `endpoint`. Every request is aborted after `timeout`.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, JobError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(JobError::Transport)?;
        Ok(Self {
            http,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends `query` as a form-encoded POST request.
    ///
    /// An empty `accept` leaves the representation up to the backend. Canceling `cancel` drops
    /// the in-flight request and yields [`JobError::Canceled`].
    pub async fn query(
        &self,
        query: &str,
        accept: &str,
        cancel: &CancellationToken,
    ) -> Result<BackendResponse, JobError> {
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .form(&[("query", query)])
            .timeout(self.timeout);
        if !accept.is_empty() {
            request = request.header(ACCEPT, accept);
        }

        let forwarded = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(JobError::Canceled),
            response = Self::read(request) => response?,
        };

        if !(200..300).contains(&forwarded.status) {
            warn!(
                status = forwarded.status,
                endpoint = %self.endpoint,
                "Backend rejected query"
            );
            return Err(JobError::Backend {
                status: forwarded.status,
                content_type: forwarded.content_type,
                body: forwarded.body,
            });
        }

        Ok(BackendResponse {
            content_type: forwarded.content_type.unwrap_or_default(),
            body: forwarded.body,
            headers: forwarded.headers,
        })
    }

    /// Relays a plain `GET` (e.g. a service description request) to the backend.
    pub async fn forward_get(&self, headers: HeaderMap) -> Result<ForwardedResponse, JobError> {
        let request = self
            .http
            .get(self.endpoint.clone())
            .headers(headers)
            .timeout(self.timeout);
        Self::read(request).await
    }

    async fn read(request: reqwest::RequestBuilder) -> Result<ForwardedResponse, JobError> {
        let response = request.send().await.map_err(JobError::from_transport)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let mut headers = response.headers().clone();
        headers.remove(CONTENT_TYPE);
        for name in &TRANSFER_HEADERS {
            headers.remove(name);
        }
        let body = response.text().await.map_err(JobError::from_transport)?;
        Ok(ForwardedResponse {
            status,
            content_type,
            body,
            headers,
        })
    }
}
