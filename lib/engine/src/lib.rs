#![doc(test(attr(deny(warnings))))]

//! Executes SPARQL queries on behalf of clients while shielding the backend.
//!
//! Queries are normalized, answered from the cache where possible and otherwise executed by a
//! [`Job`]. Jobs are scheduled on a [`Queue`] that bounds the number of concurrent backend
//! requests and rejects work once its backlog is full.

mod client;
mod error;
mod job;
mod merge;
pub mod plugin;
mod proxy;
pub mod queue;

pub use client::{BackendResponse, ForwardedResponse, SparqlClient, SPARQL_RESULTS_JSON};
pub use error::{JobError, ProxyError, QueueError};
pub use job::{CompletionReason, Job, JobInfo, JobSettings, Requester};
pub use plugin::{Plugin, PluginChain, QueryContext, QueryHook};
pub use proxy::{ProxyConfig, ProxyResponse, QueryRequest, SparqlProxy};
pub use queue::{
    Queue, QueueConfig, QueueState, Runnable, Submission, TaskId, TaskState, TaskSummary,
};
