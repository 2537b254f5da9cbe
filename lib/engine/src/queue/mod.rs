//! Admission control and bounded concurrency for jobs.
//!
//! The [`Queue`] is a handle to an actor that owns every task. All state transitions happen
//! inside the actor's loop, hence they are serialized without further locking.

mod actor;
mod task;

use crate::{BackendResponse, Job, JobError, JobInfo, QueueError};
use actor::{QueueActor, QueueCommand};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

pub use task::{QueueState, TaskId, TaskState, TaskSummary};

/// Work that can be scheduled by the [`Queue`].
#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    async fn run(&self) -> Result<BackendResponse, JobError>;

    /// Requests cancellation. Must be idempotent.
    fn cancel(&self);

    fn info(&self) -> JobInfo;
}

#[async_trait]
impl Runnable for Job {
    async fn run(&self) -> Result<BackendResponse, JobError> {
        Job::run(self).await
    }

    fn cancel(&self) {
        Job::cancel(self);
    }

    fn info(&self) -> JobInfo {
        Job::info(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// The largest number of tasks waiting for a slot. Further tasks are rejected.
    pub max_waiting: usize,
    /// The largest number of tasks running at the same time.
    pub max_concurrency: usize,
    /// How long finished tasks stay visible.
    pub retention: Duration,
    /// How often finished tasks are swept.
    pub sweep_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_waiting: usize::MAX,
            max_concurrency: 1,
            retention: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(5),
        }
    }
}

/// An admitted task whose outcome has not been awaited yet.
#[derive(Debug)]
pub struct Submission {
    id: TaskId,
    outcome: oneshot::Receiver<task::Outcome>,
}

impl Submission {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Waits until the task is done.
    pub async fn outcome(self) -> Result<BackendResponse, QueueError> {
        self.outcome.await.unwrap_or(Err(QueueError::Closed))
    }
}

/// A handle to the queue actor. Cloning the handle does not clone the queue.
#[derive(Clone, Debug)]
pub struct Queue {
    commands: mpsc::UnboundedSender<QueueCommand>,
    events: broadcast::Sender<QueueState>,
}

impl Queue {
    /// Spawns the queue actor on the current tokio runtime.
    pub fn start(config: QueueConfig) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);
        let actor = QueueActor::new(config, events.clone());
        tokio::spawn(actor.run(receiver));
        Self { commands, events }
    }

    /// Admits `job` or rejects it with [`QueueError::TooManyWaiting`] if the backlog is full.
    ///
    /// `token` is an identifier chosen by the caller to look up the task later.
    pub async fn submit(
        &self,
        job: Arc<dyn Runnable>,
        token: Option<String>,
    ) -> Result<Submission, QueueError> {
        let (outcome, receiver) = oneshot::channel();
        let id = self
            .request(|reply| QueueCommand::Enqueue {
                job,
                token,
                outcome,
                reply,
            })
            .await??;
        Ok(Submission {
            id,
            outcome: receiver,
        })
    }

    /// Admits `job` and waits until it is done.
    pub async fn enqueue(
        &self,
        job: Arc<dyn Runnable>,
        token: Option<String>,
    ) -> Result<BackendResponse, QueueError> {
        self.submit(job, token).await?.outcome().await
    }

    /// Cancels the task `id`. Returns `false` if the task is unknown or already done.
    pub async fn cancel(&self, id: TaskId) -> Result<bool, QueueError> {
        self.request(|reply| QueueCommand::Cancel { id, reply })
            .await
    }

    /// The most recent task submitted with `token`.
    pub async fn status(&self, token: &str) -> Result<Option<TaskSummary>, QueueError> {
        let token = token.to_owned();
        self.request(|reply| QueueCommand::Status { token, reply })
            .await
    }

    pub async fn state(&self) -> Result<QueueState, QueueError> {
        self.request(|reply| QueueCommand::State { reply }).await
    }

    /// Removes finished tasks older than the retention duration right away.
    pub async fn sweep(&self) -> Result<usize, QueueError> {
        self.request(|reply| QueueCommand::Sweep { reply }).await
    }

    /// Receives a [`QueueState`] after every state transition.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueState> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> QueueCommand,
    ) -> Result<T, QueueError> {
        let (reply, receiver) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| QueueError::Closed)?;
        receiver.await.map_err(|_| QueueError::Closed)
    }
}
