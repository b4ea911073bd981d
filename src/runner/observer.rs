use crate::ScreenshotError;
use crate::discovery::DiscoveryResult;
use crate::report::{AttemptOutcome, RunSummary};
use crate::task::ScreenshotTask;

/// Hooks into a run's progress. Every method defaults to doing nothing.
pub trait RunObserver: Send + Sync {
    fn on_run_start(&self, _total: usize) {}

    fn on_task_start(&self, _index: usize, _total: usize, _task: &ScreenshotTask) {}

    fn on_attempt_failed(
        &self,
        _task: &ScreenshotTask,
        _attempt: u32,
        _max_attempts: u32,
        _error: &ScreenshotError,
    ) {
    }

    fn on_task_finish(&self, _task: &ScreenshotTask, _outcome: &AttemptOutcome) {}

    fn on_relaunch(&self, _from_device: &str, _to_device: &str) {}

    fn on_discovery(&self, _site: &str, _result: &DiscoveryResult) {}

    fn on_run_finish(&self, _summary: &RunSummary) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Reports progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_run_start(&self, total: usize) {
        tracing::info!("Starting run with {} task(s)", total);
    }

    fn on_task_start(&self, index: usize, total: usize, task: &ScreenshotTask) {
        tracing::info!("[{}/{}] {} -> {}", index + 1, total, task.label(), task.target);
    }

    fn on_attempt_failed(
        &self,
        task: &ScreenshotTask,
        attempt: u32,
        max_attempts: u32,
        error: &ScreenshotError,
    ) {
        tracing::warn!(
            "{} attempt {}/{} failed: {}",
            task.label(),
            attempt,
            max_attempts,
            error
        );
    }

    fn on_task_finish(&self, task: &ScreenshotTask, outcome: &AttemptOutcome) {
        match (outcome.file_path(), outcome.error_message()) {
            (Some(path), _) => tracing::info!("{} saved to {}", task.label(), path.display()),
            (None, error) => tracing::error!(
                "{} failed after {} attempt(s): {}",
                task.label(),
                outcome.attempts_used(),
                error.unwrap_or("unknown error")
            ),
        }
    }

    fn on_relaunch(&self, from_device: &str, to_device: &str) {
        tracing::info!("Device switch {} -> {}, browser relaunched", from_device, to_device);
    }

    fn on_discovery(&self, site: &str, result: &DiscoveryResult) {
        tracing::info!(
            "Discovery for {}: category={} product={}",
            site,
            result.category_url().unwrap_or("-"),
            result.product_url().unwrap_or("-")
        );
    }

    fn on_run_finish(&self, summary: &RunSummary) {
        tracing::info!(
            "Run finished: {}/{} successful ({:.1}%)",
            summary.successful,
            summary.total,
            summary.success_rate
        );
    }
}
