use super::observer::{NoopObserver, RunObserver};
use crate::report::AttemptOutcome;
use crate::task::ScreenshotTask;
use crate::timeouts::ms;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(ms::RETRY_DELAY))
    }
}

/// One try at producing a task's screenshot.
#[async_trait::async_trait]
pub trait CaptureAttempt: Send {
    /// Runs attempt number `attempt` (starting at 1) and returns the written file.
    async fn attempt(&mut self, task: &ScreenshotTask, attempt: u32) -> Result<PathBuf>;

    /// Releases whatever a failed attempt left open.
    async fn abort(&mut self, _task: &ScreenshotTask) {}
}

pub struct RetryExecutor {
    policy: RetryPolicy,
    observer: Arc<dyn RunObserver>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs `capture` until it succeeds or the attempts are used up.
    ///
    /// Transient failures end in a failed outcome carrying the last error
    /// message. Fatal errors are returned as `Err` immediately.
    pub async fn run<A>(&self, task: &ScreenshotTask, capture: &mut A) -> Result<AttemptOutcome>
    where
        A: CaptureAttempt + ?Sized,
    {
        let max_attempts = self.policy.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match capture.attempt(task, attempt).await {
                Ok(path) => return Ok(AttemptOutcome::success(attempt, path)),
                Err(e) => {
                    capture.abort(task).await;

                    if e.is_fatal() {
                        return Err(e);
                    }

                    self.observer
                        .on_attempt_failed(task, attempt, max_attempts, &e);
                    last_error = e.to_string();

                    if attempt < max_attempts && !self.policy.delay.is_zero() {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        Ok(AttemptOutcome::failure(max_attempts, last_error))
    }
}
