use crate::CompletionReason;
use sparql_proxy_query::QueryError;

/// An error raised while a job talks to the backend.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum JobError {
    /// The backend answered with a non-success status. Status and body are passed on verbatim.
    #[error("Backend responded with status {status}")]
    Backend {
        status: u16,
        content_type: Option<String>,
        body: String,
    },
    /// The backend could not be reached or the connection broke.
    #[error("Backend request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The backend did not answer within the job timeout.
    #[error("Backend request timed out")]
    Timeout,
    /// The job was canceled before it could complete.
    #[error("Job canceled")]
    Canceled,
    /// A chunk of a split query did not contain SPARQL JSON results.
    #[error("Backend returned malformed results: {0}")]
    InvalidResults(#[from] serde_json::Error),
}

impl JobError {
    pub(crate) fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(error)
        }
    }

    /// The completion reason a job failing with this error reports.
    pub fn reason(&self) -> CompletionReason {
        match self {
            Self::Timeout => CompletionReason::Timeout,
            Self::Canceled => CompletionReason::Canceled,
            Self::Backend { .. } | Self::Transport(_) | Self::InvalidResults(_) => {
                CompletionReason::Error
            }
        }
    }
}

/// An error raised by the queue.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueueError {
    /// The backlog is full, the job was not admitted.
    #[error("Too many waiting jobs")]
    TooManyWaiting,
    /// The task was canceled, either while waiting or while running.
    #[error("Job Canceled")]
    Canceled,
    /// The job ran and failed.
    #[error(transparent)]
    Failed(JobError),
    /// The job panicked or was aborted before reporting a result.
    #[error("Job aborted: {0}")]
    Aborted(String),
    /// The queue is no longer running.
    #[error("Queue is closed")]
    Closed,
}

impl From<JobError> for QueueError {
    fn from(error: JobError) -> Self {
        match error {
            JobError::Canceled => Self::Canceled,
            error => Self::Failed(error),
        }
    }
}

/// An error returned by [`crate::SparqlProxy`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProxyError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Cache(#[from] sparql_proxy_cache::CacheError),
    #[error(transparent)]
    Job(#[from] JobError),
}
