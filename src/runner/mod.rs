pub mod capture;
pub mod observer;
pub mod retry;

use crate::chrome::{BrowserSessionManager, PageController, SessionConfig};
use crate::discovery::DiscoveryChain;
use crate::report::{ResultLog, RunReport, TaskRecord};
use crate::task::{ScreenshotTask, order_by_device};
use crate::utils::signal;
use crate::{Result, ScreenshotError};
use std::sync::Arc;

pub use capture::{CaptureOptions, DiscoveryCache, SessionCapture};
pub use observer::{NoopObserver, RunObserver, TracingObserver};
pub use retry::{CaptureAttempt, RetryExecutor, RetryPolicy};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub capture: CaptureOptions,
    pub retry: RetryPolicy,
    /// Reorder each site's tasks so equal devices run back to back.
    pub group_by_device: bool,
}

/// Processes a task list with one browser session, sequentially.
pub struct ScreenshotRunner {
    session: BrowserSessionManager,
    discovery: DiscoveryChain,
    options: RunOptions,
    observer: Arc<dyn RunObserver>,
}

impl ScreenshotRunner {
    pub fn new(
        controller: Arc<dyn PageController>,
        session_config: SessionConfig,
        options: RunOptions,
    ) -> Self {
        Self {
            session: BrowserSessionManager::new(controller, session_config),
            discovery: DiscoveryChain::default(),
            options,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_discovery(mut self, discovery: DiscoveryChain) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.session = self.session.with_observer(observer.clone());
        self.observer = observer;
        self
    }

    pub fn session(&self) -> &BrowserSessionManager {
        &self.session
    }

    /// Runs every task and returns the report.
    ///
    /// A failing task never stops the run. Only fatal errors (or a shutdown
    /// request) end it early, and the browser is closed on every path.
    pub async fn run(&self, tasks: Vec<ScreenshotTask>) -> Result<RunReport> {
        let started_at = chrono::Utc::now();
        let tasks = if self.options.group_by_device {
            order_by_device(tasks)
        } else {
            tasks
        };

        let mut log = ResultLog::new();
        self.observer.on_run_start(tasks.len());

        let processed = self.process(&tasks, &mut log).await;

        if let Err(e) = self.session.cleanup().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }

        processed?;

        let report = RunReport::new(
            started_at,
            log,
            self.session.launches(),
            self.session.relaunches(),
        );
        self.observer.on_run_finish(&report.summary);
        Ok(report)
    }

    async fn process(&self, tasks: &[ScreenshotTask], log: &mut ResultLog) -> Result<()> {
        let executor = RetryExecutor::new(self.options.retry).with_observer(self.observer.clone());
        let mut cache = DiscoveryCache::new();

        for (index, task) in tasks.iter().enumerate() {
            if signal::is_shutdown() {
                tracing::warn!("Shutdown requested, {} task(s) left", tasks.len() - index);
                return Err(ScreenshotError::Aborted);
            }

            self.observer.on_task_start(index, tasks.len(), task);

            let mut capture = SessionCapture::new(
                &self.session,
                &self.discovery,
                &mut cache,
                &self.options.capture,
                &*self.observer,
            );
            let outcome = executor.run(task, &mut capture).await?;
            let url = capture.into_last_url();

            self.observer.on_task_finish(task, &outcome);
            log.record(TaskRecord::new(task, url, outcome));
        }

        Ok(())
    }
}
