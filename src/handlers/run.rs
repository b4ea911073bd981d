use super::tasks::load_tasks;
use crate::chrome::{ChromeController, PageController};
use crate::config::Config;
use crate::discovery::DiscoveryChain;
use crate::report::RunReport;
use crate::runner::{RunObserver, ScreenshotRunner};
use crate::task::TaskFilter;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Expands the tasks, runs them against `controller` and writes the
/// results file.
pub async fn run_sites(
    controller: Arc<dyn PageController>,
    config: &Config,
    filter: &TaskFilter,
    observer: Arc<dyn RunObserver>,
) -> Result<RunReport> {
    let tasks = load_tasks(config, filter)?;

    let runner = ScreenshotRunner::new(controller, config.session_config(), config.run_options())
        .with_discovery(DiscoveryChain::with_defaults(&config.discovery.extra_hosts))
        .with_observer(observer);

    let report = runner.run(tasks).await?;
    report.write_json(&config.results_path(), config.output.json_pretty)?;

    Ok(report)
}

pub async fn handle_run(
    config: &Config,
    filter: &TaskFilter,
    observer: Arc<dyn RunObserver>,
) -> Result<RunReport> {
    crate::utils::signal::setup_handlers().await?;

    let controller = Arc::new(ChromeController::new(Duration::from_millis(
        config.performance.settle_delay_ms,
    )));

    run_sites(controller, config, filter, observer).await
}
