mod common;

use common::{FakeController, run_options, tasks};
use site_screenshooter::chrome::SessionConfig;
use site_screenshooter::report::{AttemptOutcome, RunSummary};
use site_screenshooter::runner::RunObserver;
use site_screenshooter::task::{PageType, TaskFilter};
use site_screenshooter::{ScreenshotError, ScreenshotRunner, ScreenshotTask};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl RunObserver for RecordingObserver {
    fn on_run_start(&self, total: usize) {
        self.push(format!("start {}", total));
    }

    fn on_attempt_failed(
        &self,
        task: &ScreenshotTask,
        attempt: u32,
        max_attempts: u32,
        _error: &ScreenshotError,
    ) {
        self.push(format!("{} failed {}/{}", task.site_name, attempt, max_attempts));
    }

    fn on_task_finish(&self, task: &ScreenshotTask, outcome: &AttemptOutcome) {
        self.push(format!("{} done {}", task.site_name, outcome.is_success()));
    }

    fn on_run_finish(&self, summary: &RunSummary) {
        self.push(format!("finish {}/{}", summary.successful, summary.total));
    }
}

const SITES: &str = r#"{
    "sites": [
        { "name": "acme", "baseUrl": "https://acme.test", "pages": { "home": "/" } },
        { "name": "beta", "baseUrl": "https://beta.test", "pages": { "home": "/" } }
    ],
    "defaults": { "languages": ["default"], "devices": ["desktop"] }
}"#;

fn home_only() -> TaskFilter {
    TaskFilter::new().page_types([PageType::Home])
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let controller = Arc::new(FakeController::new().fail_navigation("acme.test", 2));

    let runner = ScreenshotRunner::new(
        controller.clone(),
        SessionConfig::default(),
        run_options(dir.path(), 3),
    );
    let report = runner
        .run(tasks(SITES, &home_only().sites(["acme"])))
        .await
        .unwrap();

    assert_eq!(report.summary.total, 1);
    assert_eq!(report.summary.successful, 1);

    let outcome = &report.results[0].outcome;
    assert!(outcome.is_success());
    assert_eq!(outcome.attempts_used(), 3);
    assert!(outcome.file_path().unwrap().exists());
    assert_eq!(report.results[0].url.as_deref(), Some("https://acme.test/"));

    let state = controller.state();
    assert_eq!(state.navigations.len(), 3);
    assert!(state.navigations.iter().all(|u| u == "https://acme.test/?v=desktop"));
    // The browser survives failed attempts and is closed once at the end.
    assert_eq!(state.launches, 1);
    assert_eq!(state.closed_browsers, 1);
}

#[tokio::test]
async fn test_exhausted_task_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let controller = Arc::new(FakeController::new().fail_navigation("acme.test", 100));

    let runner = ScreenshotRunner::new(
        controller.clone(),
        SessionConfig::default(),
        run_options(dir.path(), 2),
    );
    let report = runner.run(tasks(SITES, &home_only())).await.unwrap();

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.successful, 1);
    assert_eq!(report.summary.success_rate, 50.0);

    let failed = &report.results[0];
    assert_eq!(failed.site_name, "acme");
    assert!(!failed.outcome.is_success());
    assert_eq!(failed.outcome.attempts_used(), 2);
    assert!(failed.outcome.file_path().is_none());
    assert!(
        failed
            .outcome
            .error_message()
            .unwrap()
            .contains("ERR_CONNECTION_RESET")
    );

    let passed = &report.results[1];
    assert_eq!(passed.site_name, "beta");
    assert_eq!(passed.outcome.attempts_used(), 1);
    assert!(dir.path().join("beta/default/desktop/home.png").exists());
}

#[tokio::test]
async fn test_capture_failure_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let controller = Arc::new(FakeController::new().fail_captures(1));

    let runner = ScreenshotRunner::new(
        controller.clone(),
        SessionConfig::default(),
        run_options(dir.path(), 3),
    );
    let report = runner
        .run(tasks(SITES, &home_only().sites(["beta"])))
        .await
        .unwrap();

    assert_eq!(report.results[0].outcome.attempts_used(), 2);
    assert_eq!(controller.state().captures.len(), 1);
}

#[tokio::test]
async fn test_observer_sees_every_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let controller = Arc::new(FakeController::new().fail_navigation("acme.test", 100));
    let observer = Arc::new(RecordingObserver::default());

    let runner = ScreenshotRunner::new(
        controller,
        SessionConfig::default(),
        run_options(dir.path(), 2),
    )
    .with_observer(observer.clone());
    runner.run(tasks(SITES, &home_only())).await.unwrap();

    assert_eq!(
        observer.events(),
        vec![
            "start 2",
            "acme failed 1/2",
            "acme failed 2/2",
            "acme done false",
            "beta done true",
            "finish 1/2",
        ]
    );
}

#[tokio::test]
async fn test_retry_relaunches_a_broken_browser() {
    let dir = tempfile::tempdir().unwrap();
    let controller = Arc::new(FakeController::new().first_browser_pages(1));
    let sites = r#"{
        "sites": [
            { "name": "acme", "baseUrl": "https://acme.test", "pages": { "home": "/" } },
            { "name": "beta", "baseUrl": "https://beta.test", "pages": { "home": "/" } },
            { "name": "gamma", "baseUrl": "https://gamma.test", "pages": { "home": "/" } }
        ],
        "defaults": { "languages": ["default"], "devices": ["desktop"] }
    }"#;

    let runner = ScreenshotRunner::new(
        controller.clone(),
        SessionConfig::default(),
        run_options(dir.path(), 3),
    );
    let report = runner.run(tasks(sites, &home_only())).await.unwrap();

    assert_eq!(report.summary.successful, 3);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.results[1].site_name, "beta");
    assert_eq!(report.results[1].outcome.attempts_used(), 2);
    assert_eq!(report.results[2].outcome.attempts_used(), 1);
    assert_eq!(report.browser_launches, 2);
    assert_eq!(report.browser_relaunches, 0);

    let state = controller.state();
    assert_eq!(state.launches, 2);
    assert_eq!(state.closed_browsers, 2);
}

#[tokio::test]
async fn test_fatal_error_still_closes_browser() {
    let dir = tempfile::tempdir().unwrap();
    let controller = Arc::new(FakeController::new().fatal_navigation(2));
    let observer = Arc::new(RecordingObserver::default());

    let runner = ScreenshotRunner::new(
        controller.clone(),
        SessionConfig::default(),
        run_options(dir.path(), 3),
    )
    .with_observer(observer.clone());
    let err = runner.run(tasks(SITES, &home_only())).await.unwrap_err();

    assert!(matches!(err, ScreenshotError::NoActivePage));
    assert_eq!(
        observer.events(),
        vec!["start 2", "acme done true"],
        "a fatal error is neither retried nor summarized"
    );

    let state = controller.state();
    assert_eq!(state.navigations.len(), 2);
    assert_eq!(state.launches, 1);
    assert_eq!(state.closed_browsers, 1);
    assert_eq!(state.open_browser, None);
}

#[tokio::test]
async fn test_missing_chrome_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let controller = Arc::new(FakeController::new().missing_chrome());

    let runner = ScreenshotRunner::new(
        controller.clone(),
        SessionConfig::default(),
        run_options(dir.path(), 3),
    );
    let err = runner.run(tasks(SITES, &home_only())).await.unwrap_err();

    assert!(matches!(err, ScreenshotError::ChromeNotFound));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(controller.state().launch_attempts, 1);
}
