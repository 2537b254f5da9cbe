use crate::{
    BackendResponse, ForwardedResponse, Job, JobSettings, PluginChain, ProxyError, Queue,
    QueueConfig, QueueState, Requester, SparqlClient, TaskId, TaskSummary, SPARQL_RESULTS_JSON,
};
use reqwest::header::HeaderMap;
use sparql_proxy_cache::Cache;
use sparql_proxy_query::{ExecutionPlan, PreparedQuery};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};
use url::Url;

/// Holds the configuration of a [`SparqlProxy`].
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// The SPARQL endpoint that is protected.
    pub backend: Url,
    /// The deadline of every backend request.
    pub timeout: Duration,
    pub settings: JobSettings,
    /// Sends queries unmodified, disabling normalization, splitting and caching.
    pub passthrough: bool,
    pub queue: QueueConfig,
}

/// A query submitted by a client.
#[derive(Clone, Debug, Default)]
pub struct QueryRequest {
    pub query: String,
    pub requester: Requester,
    /// Identifier under which the client may poll the job.
    pub token: Option<String>,
}

/// The answer to a [`QueryRequest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyResponse {
    pub content_type: String,
    pub body: String,
    pub cache_hit: bool,
}

impl ProxyResponse {
    fn miss(response: BackendResponse) -> Self {
        Self {
            content_type: response.content_type,
            body: response.body,
            cache_hit: false,
        }
    }
}

/// Entry point of the proxy: normalizes queries, answers from the cache when possible and
/// schedules backend jobs on the queue otherwise.
#[derive(Clone, Debug)]
pub struct SparqlProxy {
    client: SparqlClient,
    cache: Cache,
    queue: Queue,
    plugins: PluginChain,
    settings: JobSettings,
    passthrough: bool,
}

impl SparqlProxy {
    /// Creates the proxy and starts its queue on the current tokio runtime.
    pub fn start(
        config: ProxyConfig,
        cache: Cache,
        plugins: PluginChain,
    ) -> Result<Self, ProxyError> {
        let client = SparqlClient::new(config.backend, config.timeout)?;
        Ok(Self {
            client,
            cache,
            queue: Queue::start(config.queue),
            plugins,
            settings: config.settings,
            passthrough: config.passthrough,
        })
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    pub async fn query(&self, request: QueryRequest) -> Result<ProxyResponse, ProxyError> {
        let QueryRequest {
            query: raw_query,
            mut requester,
            token,
        } = request;

        if self.passthrough {
            let job = Job::passthrough(self.client.clone(), raw_query, requester);
            let response = self.queue.enqueue(Arc::new(job), token).await?;
            return Ok(ProxyResponse::miss(response));
        }

        let query = PreparedQuery::parse(&raw_query)?;
        if matches!(
            query.plan(self.settings.limits, self.settings.splitting),
            ExecutionPlan::Split(_)
        ) {
            requester.accept = SPARQL_RESULTS_JSON.to_owned();
        }

        let key = self.cache.key(&query.canonical_text(), &requester.accept);
        if let Some(entry) = self.cache.get(&key).await {
            info!(key, "Cache hit");
            return Ok(ProxyResponse {
                content_type: entry.content_type,
                body: entry.body,
                cache_hit: true,
            });
        }
        debug!(key, "Cache miss");

        let job = Job::prepared(
            self.client.clone(),
            self.plugins.clone(),
            self.settings,
            raw_query,
            query,
            requester,
        )
        .with_cache(self.cache.clone(), key);
        let response = self.queue.enqueue(Arc::new(job), token).await?;
        Ok(ProxyResponse::miss(response))
    }

    /// Relays a request without a query to the backend, e.g. to fetch its service description.
    pub async fn forward(&self, headers: HeaderMap) -> Result<ForwardedResponse, ProxyError> {
        Ok(self.client.forward_get(headers).await?)
    }

    pub async fn cancel(&self, id: TaskId) -> Result<bool, ProxyError> {
        Ok(self.queue.cancel(id).await?)
    }

    pub async fn purge_cache(&self) -> Result<(), ProxyError> {
        self.cache.purge().await?;
        info!("Cache purged");
        Ok(())
    }

    pub async fn job_status(&self, token: &str) -> Result<Option<TaskSummary>, ProxyError> {
        Ok(self.queue.status(token).await?)
    }

    pub async fn state(&self) -> Result<QueueState, ProxyError> {
        Ok(self.queue.state().await?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueState> {
        self.queue.subscribe()
    }
}
