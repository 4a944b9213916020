//! Server-side task tracking.
//!
//! Write requests are accepted by the engine as tasks. [`TaskProcessor`]
//! polls a task until it reaches a terminal status or a timeout elapses.

pub use crate::client::TaskStatus;
use crate::client::{EnqueuedTask, SearchClient, Task};
use crate::config::TasksConfig;
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Final state of a processed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task completed.
    Succeeded(Task),
    /// The task completed with an error.
    Failed(Task),
    /// The task was canceled.
    Canceled(Task),
    /// The timeout elapsed first; carries the enqueue summary.
    TimedOut(EnqueuedTask),
}

impl TaskOutcome {
    /// Returns true for [`TaskOutcome::Succeeded`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Returns the task uid.
    #[must_use]
    pub const fn task_uid(&self) -> u64 {
        match self {
            Self::Succeeded(task) | Self::Failed(task) | Self::Canceled(task) => task.uid,
            Self::TimedOut(enqueued) => enqueued.task_uid,
        }
    }

    /// Converts anything but success into an error.
    ///
    /// # Errors
    ///
    /// [`Error::TaskFailed`] for failed or canceled tasks, [`Error::Timeout`]
    /// for timed-out ones.
    pub fn into_result(self, timeout: Duration) -> Result<Task> {
        match self {
            Self::Succeeded(task) => Ok(task),
            Self::Failed(task) | Self::Canceled(task) => Err(task_failed(&task)),
            Self::TimedOut(enqueued) => Err(Error::Timeout {
                uid: enqueued.task_uid,
                elapsed_ms: duration_ms(timeout),
            }),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Builds the error for a task that did not succeed.
pub(crate) fn task_failed(task: &Task) -> Error {
    Error::TaskFailed {
        uid: task.uid,
        status: task.status.to_string(),
        reason: task
            .error
            .as_ref()
            .map_or_else(|| task.task_type.clone(), |e| format!("{} ({})", e.message, e.code)),
    }
}

/// Polls tasks on a [`SearchClient`].
///
/// # Example
///
/// ```rust,ignore
/// let processor = TaskProcessor::new(&client).with_timeout(Duration::from_secs(60));
/// match processor.process(client.delete_index("movies")).await? {
///     TaskOutcome::Succeeded(task) => println!("deleted in {:?}", task.duration),
///     other => eprintln!("not deleted: {other:?}"),
/// }
/// ```
pub struct TaskProcessor<'a, C> {
    client: &'a C,
    timeout: Duration,
    interval: Duration,
}

impl<'a, C: SearchClient> TaskProcessor<'a, C> {
    /// Default time to wait for one task.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

    /// Default delay between two polls.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(50);

    /// Creates a processor with default timings.
    #[must_use]
    pub const fn new(client: &'a C) -> Self {
        Self {
            client,
            timeout: Self::DEFAULT_TIMEOUT,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    /// Creates a processor using configured timings.
    #[must_use]
    pub const fn from_config(client: &'a C, config: &TasksConfig) -> Self {
        Self {
            client,
            timeout: config.timeout,
            interval: config.poll_interval,
        }
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Returns the timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the client.
    #[must_use]
    pub const fn client(&self) -> &'a C {
        self.client
    }

    /// Awaits `enqueue`, then waits for the resulting task.
    ///
    /// # Errors
    ///
    /// Errors from `enqueue` or from polling. A timeout is not an error; it
    /// yields [`TaskOutcome::TimedOut`].
    pub async fn process<F>(&self, enqueue: F) -> Result<TaskOutcome>
    where
        F: Future<Output = Result<EnqueuedTask>>,
    {
        let enqueued = enqueue.await?;
        let deadline = Instant::now() + self.timeout;

        let outcome = match self.poll_until(enqueued.task_uid, deadline).await? {
            Some(task) => match task.status {
                TaskStatus::Failed => Self::failed(task),
                TaskStatus::Canceled => TaskOutcome::Canceled(task),
                _ => TaskOutcome::Succeeded(task),
            },
            None => {
                tracing::warn!(task_uid = enqueued.task_uid, timeout_ms = duration_ms(self.timeout), "task timed out");
                TaskOutcome::TimedOut(enqueued)
            },
        };

        let status = match &outcome {
            TaskOutcome::Succeeded(_) => "succeeded",
            TaskOutcome::Failed(_) => "failed",
            TaskOutcome::Canceled(_) => "canceled",
            TaskOutcome::TimedOut(_) => "timed_out",
        };
        metrics::counter!("tasks_finished_total", "status" => status).increment(1);
        Ok(outcome)
    }

    /// Awaits `enqueue` and requires the task to succeed.
    ///
    /// # Errors
    ///
    /// As [`Self::process`], plus [`Error::TaskFailed`] and [`Error::Timeout`].
    pub async fn process_ok<F>(&self, enqueue: F) -> Result<Task>
    where
        F: Future<Output = Result<EnqueuedTask>>,
    {
        self.process(enqueue).await?.into_result(self.timeout)
    }

    /// Waits for every task in `task_uids` under one shared `timeout`.
    ///
    /// Returns the finished tasks in input order, whatever their status.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] naming the first unfinished task, or a polling error.
    pub async fn wait_for_tasks(&self, task_uids: &[u64], timeout: Duration) -> Result<Vec<Task>> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut tasks = Vec::with_capacity(task_uids.len());

        for &uid in task_uids {
            match self.poll_until(uid, deadline).await? {
                Some(task) => tasks.push(task),
                None => {
                    tracing::warn!(task_uid = uid, pending = task_uids.len() - tasks.len(), "tasks timed out");
                    return Err(Error::Timeout {
                        uid,
                        elapsed_ms: duration_ms(started.elapsed()),
                    });
                },
            }
        }
        Ok(tasks)
    }

    fn failed(task: Task) -> TaskOutcome {
        tracing::warn!(
            task_uid = task.uid,
            task_type = %task.task_type,
            error = ?task.error.as_ref().map(|e| &e.message),
            "task failed"
        );
        TaskOutcome::Failed(task)
    }

    /// Polls `uid` until it finishes. `None` once `deadline` passes.
    async fn poll_until(&self, uid: u64, deadline: Instant) -> Result<Option<Task>> {
        loop {
            let task = self.client.get_task(uid).await?;
            tracing::debug!(task_uid = uid, status = %task.status, "polled task");
            if task.status.is_finished() {
                return Ok(Some(task));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.interval.min(deadline.saturating_duration_since(Instant::now())))
                .await;
        }
    }
}
