//! Blocking wait for asynchronous platform tasks.
//!
//! Polls with exponential backoff until the task succeeds or fails, the
//! deadline passes, or the cancellation signal fires. There is no retry: a
//! failed task aborts the caller's action.

use std::time::Duration;

use anyhow::{Context, Result};
use clonekeeper_common::TaskState;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::application::ports::{TaskHandle, TaskMonitor};
use crate::domain::config::TaskConfig;
use crate::domain::{LifecycleError, TaskFault};

/// Backoff schedule and deadline for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: u32,
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::from(&TaskConfig::default())
    }
}

impl From<&TaskConfig> for WaitPolicy {
    fn from(cfg: &TaskConfig) -> Self {
        Self {
            initial_interval: cfg.initial_interval(),
            max_interval: cfg.max_interval(),
            multiplier: 2,
            timeout: cfg.timeout(),
        }
    }
}

impl WaitPolicy {
    fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(self.multiplier).min(self.max_interval)
    }
}

/// Waits on tasks reported by a [`TaskMonitor`].
pub struct TaskAwaiter<'a, M: TaskMonitor> {
    monitor: &'a M,
    policy: WaitPolicy,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, M: TaskMonitor> TaskAwaiter<'a, M> {
    #[must_use]
    pub fn new(monitor: &'a M, policy: WaitPolicy) -> Self {
        Self {
            monitor,
            policy,
            cancel: None,
        }
    }

    /// Abort waits once `cancel` becomes `true`.
    #[must_use]
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Block until `task` reaches a terminal state.
    ///
    /// Returns the task's result value, if it reported one.
    ///
    /// # Errors
    ///
    /// `TaskFailed` with the platform's fault, `Timeout` once the policy's
    /// deadline passes, `Cancelled` when the signal fires, or the monitor's
    /// own error if polling fails.
    pub async fn wait(&self, operation: &str, task: &TaskHandle) -> Result<Option<String>> {
        let task_id = match task {
            TaskHandle::Completed => return Ok(None),
            TaskHandle::Remote(id) => id,
        };
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        let mut interval = self.policy.initial_interval;
        let mut cancel = self.cancel.clone();

        loop {
            if is_cancelled(cancel.as_ref()) {
                return Err(cancelled(operation));
            }
            let info = self
                .monitor
                .task_info(task_id)
                .await
                .with_context(|| format!("polling {operation} task {task_id}"))?;
            match info.state {
                TaskState::Success => return Ok(info.result),
                TaskState::Error => {
                    return Err(LifecycleError::TaskFailed {
                        operation: operation.to_string(),
                        fault: info
                            .fault
                            .unwrap_or_else(|| TaskFault::other("task reported an error")),
                    }
                    .into());
                }
                TaskState::Queued | TaskState::Running => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(LifecycleError::Timeout {
                    operation: operation.to_string(),
                    elapsed: now - started,
                }
                .into());
            }
            tracing::debug!(operation, task = %task_id, state = ?info.state, ?interval, "task still running");

            tokio::select! {
                () = tokio::time::sleep(interval.min(deadline - now)) => {}
                () = wait_cancelled(&mut cancel) => return Err(cancelled(operation)),
            }
            interval = self.policy.next_interval(interval);
        }
    }
}

fn is_cancelled(cancel: Option<&watch::Receiver<bool>>) -> bool {
    cancel.is_some_and(|rx| *rx.borrow())
}

async fn wait_cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = cancel else {
        return std::future::pending().await;
    };
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        // Sender dropped without cancelling.
        std::future::pending::<()>().await;
    }
}

fn cancelled(operation: &str) -> anyhow::Error {
    LifecycleError::Cancelled {
        operation: operation.to_string(),
    }
    .into()
}
