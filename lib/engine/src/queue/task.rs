use crate::{BackendResponse, JobInfo, QueueError, Runnable};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Identifies a task for as long as the queue retains it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Waiting,
    Running,
    Done,
}

pub(crate) type Outcome = Result<BackendResponse, QueueError>;

pub(crate) struct Task {
    pub(crate) id: TaskId,
    pub(crate) token: Option<String>,
    pub(crate) job: Arc<dyn Runnable>,
    pub(crate) state: TaskState,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) started_at: Option<OffsetDateTime>,
    pub(crate) done_at: Option<OffsetDateTime>,
    /// Taken when the task reaches `done`.
    pub(crate) outcome: Option<oneshot::Sender<Outcome>>,
}

impl Task {
    pub(crate) fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id,
            state: self.state,
            created_at: self.created_at,
            started_at: self.started_at,
            done_at: self.done_at,
            data: self.job.info(),
        }
    }

    /// Moves the task to `done` and resolves its caller. Has no effect on a task that is
    /// already done.
    pub(crate) fn finish(&mut self, outcome: Outcome) {
        if self.state == TaskState::Done {
            return;
        }
        self.state = TaskState::Done;
        self.done_at = Some(OffsetDateTime::now_utc());
        if let Some(sender) = self.outcome.take() {
            let _ = sender.send(outcome);
        }
    }
}

/// A point-in-time view of a task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: TaskId,
    pub state: TaskState,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub done_at: Option<OffsetDateTime>,
    pub data: JobInfo,
}

/// A point-in-time view of the queue. Tasks are ordered newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub jobs: Vec<TaskSummary>,
    pub num_waiting: usize,
    pub num_running: usize,
}
