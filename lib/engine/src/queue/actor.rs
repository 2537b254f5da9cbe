use super::task::{Outcome, Task};
use super::{QueueConfig, QueueState, Runnable, TaskId, TaskState, TaskSummary};
use crate::QueueError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Commands sent to the queue's event loop.
pub(crate) enum QueueCommand {
    Enqueue {
        job: Arc<dyn Runnable>,
        token: Option<String>,
        outcome: oneshot::Sender<Outcome>,
        reply: oneshot::Sender<Result<TaskId, QueueError>>,
    },
    Cancel {
        id: TaskId,
        reply: oneshot::Sender<bool>,
    },
    Status {
        token: String,
        reply: oneshot::Sender<Option<TaskSummary>>,
    },
    State {
        reply: oneshot::Sender<QueueState>,
    },
    Sweep {
        reply: oneshot::Sender<usize>,
    },
}

struct Completion {
    id: TaskId,
    outcome: Outcome,
}

pub(crate) struct QueueActor {
    config: QueueConfig,
    retention: time::Duration,
    tasks: HashMap<TaskId, Task>,
    waiting: VecDeque<TaskId>,
    running: HashSet<TaskId>,
    events: broadcast::Sender<QueueState>,
    completions: mpsc::UnboundedSender<Completion>,
    completed: mpsc::UnboundedReceiver<Completion>,
}

impl QueueActor {
    pub(crate) fn new(config: QueueConfig, events: broadcast::Sender<QueueState>) -> Self {
        let (completions, completed) = mpsc::unbounded_channel();
        Self {
            config,
            retention: time::Duration::try_from(config.retention).unwrap_or(time::Duration::MAX),
            tasks: HashMap::new(),
            waiting: VecDeque::new(),
            running: HashSet::new(),
            events,
            completions,
            completed,
        }
    }

    /// Runs until every [`super::Queue`] handle is dropped.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<QueueCommand>) {
        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(completion) = self.completed.recv() => self.complete(completion),
                _ = sweep.tick() => {
                    self.sweep();
                }
            }
        }
        debug!("Queue stopped");
    }

    fn handle(&mut self, command: QueueCommand) {
        match command {
            QueueCommand::Enqueue {
                job,
                token,
                outcome,
                reply,
            } => {
                let _ = reply.send(self.enqueue(job, token, outcome));
            }
            QueueCommand::Cancel { id, reply } => {
                let _ = reply.send(self.cancel(id));
            }
            QueueCommand::Status { token, reply } => {
                let _ = reply.send(self.status(&token));
            }
            QueueCommand::State { reply } => {
                let _ = reply.send(self.snapshot());
            }
            QueueCommand::Sweep { reply } => {
                let _ = reply.send(self.sweep());
            }
        }
    }

    fn enqueue(
        &mut self,
        job: Arc<dyn Runnable>,
        token: Option<String>,
        outcome: oneshot::Sender<Outcome>,
    ) -> Result<TaskId, QueueError> {
        if self.waiting.len() >= self.config.max_waiting {
            warn!(
                num_waiting = self.waiting.len(),
                "Rejecting job, too many waiting jobs"
            );
            return Err(QueueError::TooManyWaiting);
        }

        let id = TaskId::new();
        info!(task_id = %id, token = token.as_deref(), "Job enqueued");
        self.tasks.insert(
            id,
            Task {
                id,
                token,
                job,
                state: TaskState::Waiting,
                created_at: OffsetDateTime::now_utc(),
                started_at: None,
                done_at: None,
                outcome: Some(outcome),
            },
        );
        self.waiting.push_back(id);
        self.broadcast();
        self.dequeue();
        Ok(id)
    }

    /// Starts waiting tasks in FIFO order until all slots are taken.
    fn dequeue(&mut self) {
        while self.running.len() < self.config.max_concurrency {
            let Some(id) = self.waiting.pop_front() else {
                return;
            };
            let Some(task) = self.tasks.get_mut(&id) else {
                continue;
            };

            task.state = TaskState::Running;
            task.started_at = Some(OffsetDateTime::now_utc());
            self.running.insert(id);
            info!(task_id = %id, "Job started");

            let job = Arc::clone(&task.job);
            let completions = self.completions.clone();
            tokio::spawn(async move {
                let execution = tokio::spawn(async move { job.run().await });
                let outcome = match execution.await {
                    Ok(result) => result.map_err(QueueError::from),
                    Err(error) => Err(QueueError::Aborted(error.to_string())),
                };
                let _ = completions.send(Completion { id, outcome });
            });
            self.broadcast();
        }
    }

    fn complete(&mut self, Completion { id, outcome }: Completion) {
        self.running.remove(&id);
        if let Some(task) = self.tasks.get_mut(&id) {
            match &outcome {
                Ok(_) => info!(task_id = %id, "Job done"),
                Err(error) => info!(task_id = %id, %error, "Job failed"),
            }
            task.finish(outcome);
        }
        self.broadcast();
        self.dequeue();
    }

    fn cancel(&mut self, id: TaskId) -> bool {
        let Some(task) = self.tasks.get_mut(&id) else {
            return false;
        };
        match task.state {
            TaskState::Waiting => {
                task.job.cancel();
                task.finish(Err(QueueError::Canceled));
                self.waiting.retain(|waiting| *waiting != id);
                info!(task_id = %id, "Waiting job canceled");
                self.broadcast();
                true
            }
            TaskState::Running => {
                task.job.cancel();
                info!(task_id = %id, "Running job cancellation requested");
                self.broadcast();
                true
            }
            TaskState::Done => false,
        }
    }

    fn status(&self, token: &str) -> Option<TaskSummary> {
        self.tasks
            .values()
            .filter(|task| task.token.as_deref() == Some(token))
            .max_by_key(|task| task.created_at)
            .map(Task::summary)
    }

    fn sweep(&mut self) -> usize {
        let now = OffsetDateTime::now_utc();
        let retention = self.retention;
        let before = self.tasks.len();
        self.tasks.retain(|_, task| match task.done_at {
            Some(done_at) => now - done_at < retention,
            None => true,
        });
        let removed = before - self.tasks.len();
        if removed > 0 {
            debug!(removed, "Swept finished jobs");
            self.broadcast();
        }
        removed
    }

    fn snapshot(&self) -> QueueState {
        let mut jobs = self.tasks.values().map(Task::summary).collect::<Vec<_>>();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        QueueState {
            jobs,
            num_waiting: self.waiting.len(),
            num_running: self.running.len(),
        }
    }

    fn broadcast(&self) {
        if self.events.receiver_count() > 0 {
            let _ = self.events.send(self.snapshot());
        }
    }
}
