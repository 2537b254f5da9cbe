use crate::merge::SolutionsMerger;
use crate::plugin::{PluginChain, QueryContext, Terminal};
use crate::{BackendResponse, JobError, SparqlClient, SPARQL_RESULTS_JSON};
use async_trait::async_trait;
use serde::Serialize;
use sparql_proxy_cache::{Cache, CacheEntry};
use sparql_proxy_query::{ExecutionPlan, Limits, PreparedQuery, SplitPlan};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why a job finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionReason {
    Success,
    Error,
    Timeout,
    Canceled,
}

/// The user-visible data of a job, as shown in queue snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub ip: String,
    pub query: String,
    pub reason: Option<CompletionReason>,
}

/// How queries are reshaped before they are sent to the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JobSettings {
    pub limits: Limits,
    /// Whether SELECT queries are fetched in chunks.
    pub splitting: bool,
}

/// Who issued a query and which representation they asked for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Requester {
    pub ip: String,
    pub accept: String,
}

struct CacheSlot {
    cache: Cache,
    key: String,
}

/// A single execution of a query against the backend.
///
/// A job runs at most once. It can be canceled at any time: a pending backend request is
/// dropped and no further request is issued.
pub struct Job {
    client: SparqlClient,
    plugins: PluginChain,
    settings: JobSettings,
    requester: Requester,
    raw_query: String,
    /// `None` in passthrough mode.
    query: Option<PreparedQuery>,
    cache_slot: Option<CacheSlot>,
    cancel: CancellationToken,
    started: AtomicBool,
    reason: OnceLock<CompletionReason>,
}

impl Job {
    /// A job sending `raw_query` unmodified. Passthrough jobs are never split or cached.
    pub fn passthrough(
        client: SparqlClient,
        raw_query: impl Into<String>,
        requester: Requester,
    ) -> Self {
        Self::new(
            client,
            PluginChain::default(),
            JobSettings::default(),
            raw_query.into(),
            None,
            requester,
        )
    }

    /// A job sending the normalized form of `query`, reshaped according to `settings`.
    pub fn prepared(
        client: SparqlClient,
        plugins: PluginChain,
        settings: JobSettings,
        raw_query: impl Into<String>,
        query: PreparedQuery,
        requester: Requester,
    ) -> Self {
        Self::new(
            client,
            plugins,
            settings,
            raw_query.into(),
            Some(query),
            requester,
        )
    }

    fn new(
        client: SparqlClient,
        plugins: PluginChain,
        settings: JobSettings,
        raw_query: String,
        query: Option<PreparedQuery>,
        requester: Requester,
    ) -> Self {
        Self {
            client,
            plugins,
            settings,
            requester,
            raw_query,
            query,
            cache_slot: None,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            reason: OnceLock::new(),
        }
    }

    /// Stores a successful result in `cache` under `key`. Ignored in passthrough mode.
    #[must_use]
    pub fn with_cache(mut self, cache: Cache, key: impl Into<String>) -> Self {
        if self.query.is_some() {
            self.cache_slot = Some(CacheSlot {
                cache,
                key: key.into(),
            });
        }
        self
    }

    pub fn reason(&self) -> Option<CompletionReason> {
        self.reason.get().copied()
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn info(&self) -> JobInfo {
        JobInfo {
            ip: self.requester.ip.clone(),
            query: self.raw_query.clone(),
            reason: self.reason(),
        }
    }

    /// Requests cancellation. A job that has not started yet is finished right away.
    pub fn cancel(&self) {
        self.cancel.cancel();
        if !self.started.load(Ordering::Acquire) {
            let _ = self.reason.set(CompletionReason::Canceled);
        }
    }

    /// Executes the job and stores a successful result in the cache.
    pub async fn run(&self) -> Result<BackendResponse, JobError> {
        self.started.store(true, Ordering::Release);
        let result = if self.cancel.is_cancelled() {
            Err(JobError::Canceled)
        } else {
            self.dispatch().await
        };

        let reason = match &result {
            Ok(_) => CompletionReason::Success,
            Err(error) => error.reason(),
        };
        let _ = self.reason.set(reason);

        if let (Ok(response), Some(slot)) = (&result, &self.cache_slot) {
            let entry = CacheEntry::new(response.content_type.clone(), response.body.clone());
            slot.cache.put(&slot.key, &entry).await;
        }
        result
    }

    async fn dispatch(&self) -> Result<BackendResponse, JobError> {
        let Some(query) = &self.query else {
            return self
                .client
                .query(&self.raw_query, &self.requester.accept, &self.cancel)
                .await;
        };

        if self.plugins.is_empty() {
            return self.execute_prepared(query).await;
        }
        let context = QueryContext {
            preamble: query.preamble().to_owned(),
            query: query.query().clone(),
        };
        self.plugins.run(context, self).await
    }

    async fn execute_prepared(&self, query: &PreparedQuery) -> Result<BackendResponse, JobError> {
        match query.plan(self.settings.limits, self.settings.splitting) {
            ExecutionPlan::Single { limit: None } => {
                self.client
                    .query(
                        &query.canonical_text(),
                        &self.requester.accept,
                        &self.cancel,
                    )
                    .await
            }
            ExecutionPlan::Single { limit: Some(limit) } => {
                let text = query.text_with_window(query.offset(), Some(limit));
                self.client
                    .query(&text, &self.requester.accept, &self.cancel)
                    .await
            }
            ExecutionPlan::Split(plan) => self.execute_split(query, plan).await,
        }
    }

    async fn execute_split(
        &self,
        query: &PreparedQuery,
        plan: SplitPlan,
    ) -> Result<BackendResponse, JobError> {
        let mut merger = SolutionsMerger::default();
        let mut chunk = Some(plan.first_chunk());
        while let Some((offset, length)) = chunk {
            if self.cancel.is_cancelled() {
                return Err(JobError::Canceled);
            }
            debug!(offset, chunk_size = length, "Requesting chunk");
            let text = query.text_with_window(offset, Some(length));
            let response = self
                .client
                .query(&text, SPARQL_RESULTS_JSON, &self.cancel)
                .await?;
            let returned = merger.push(response)?;
            chunk = plan.next_chunk(offset, returned);
        }
        Ok(merger.finish())
    }
}

#[async_trait]
impl Terminal for Job {
    async fn execute(&self, context: QueryContext) -> Result<BackendResponse, JobError> {
        let query = PreparedQuery::from_parts(context.preamble, context.query);
        self.execute_prepared(&query).await
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("requester", &self.requester)
            .field("raw_query", &self.raw_query)
            .field("passthrough", &self.query.is_none())
            .field("reason", &self.reason())
            .finish_non_exhaustive()
    }
}
