#![allow(dead_code)]

use site_screenshooter::chrome::{
    BrowserHandle, LaunchOptions, NavigateOptions, PageController, PageHandle,
};
use site_screenshooter::devices::Viewport;
use site_screenshooter::runner::{CaptureOptions, RetryPolicy, RunOptions};
use site_screenshooter::task::url::OutputLayout;
use site_screenshooter::task::{TaskFilter, build_tasks};
use site_screenshooter::{Result, ScreenshotError, ScreenshotTask, SitesFile};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Links returned per selector, keyed by page URL.
pub type FakeDom = HashMap<String, HashMap<String, Vec<String>>>;

#[derive(Debug, Default)]
pub struct FakeState {
    pub launch_attempts: usize,
    pub launches: usize,
    pub closed_browsers: usize,
    pub flushes: usize,
    pub open_browser: Option<u64>,
    pub pages: HashMap<u64, Option<String>>,
    pub closed_pages: usize,
    pub viewports: Vec<(u64, u32)>,
    pub user_agents: Vec<String>,
    pub navigations: Vec<String>,
    pub captures: Vec<PathBuf>,
    navigation_failures: HashMap<String, usize>,
    capture_failures: usize,
    fail_flush: bool,
    missing_chrome: bool,
    first_browser_pages: Option<usize>,
    dead_browsers: Vec<u64>,
    fatal_navigation: Option<usize>,
    next_id: u64,
}

/// In-memory browser: counts lifecycle calls, serves a scripted DOM and
/// fails navigations on request.
#[derive(Default)]
pub struct FakeController {
    state: Mutex<FakeState>,
    dom: FakeDom,
}

/// Page URL without query and fragment, the key used by [`FakeDom`].
pub fn page_key(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// Expands a sites JSON document into its filtered task list.
pub fn tasks(sites_json: &str, filter: &TaskFilter) -> Vec<ScreenshotTask> {
    let sites = SitesFile::from_json(sites_json).unwrap();
    build_tasks(&sites.sites, &sites.defaults, filter).unwrap()
}

/// Run options writing to `output_dir` with no pause between attempts.
pub fn run_options(output_dir: &Path, max_attempts: u32) -> RunOptions {
    RunOptions {
        capture: CaptureOptions {
            output_dir: output_dir.to_path_buf(),
            layout: OutputLayout::SiteFirst,
            hide_selectors: vec![".upButton".to_string()],
            discovery_wait: Duration::from_millis(10),
        },
        retry: RetryPolicy::new(max_attempts, Duration::ZERO),
        group_by_device: false,
    }
}

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dom(mut self, page_url: &str, selector: &str, links: &[&str]) -> Self {
        self.dom
            .entry(page_key(page_url))
            .or_default()
            .insert(
                selector.to_string(),
                links.iter().map(|l| l.to_string()).collect(),
            );
        self
    }

    /// Navigations to URLs containing `pattern` fail `times` times.
    pub fn fail_navigation(self, pattern: &str, times: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .navigation_failures
            .insert(pattern.to_string(), times);
        self
    }

    pub fn fail_captures(self, times: usize) -> Self {
        self.state.lock().unwrap().capture_failures = times;
        self
    }

    pub fn fail_flush(self) -> Self {
        self.state.lock().unwrap().fail_flush = true;
        self
    }

    /// The first browser opens `pages` pages, then refuses new ones as if
    /// its connection had dropped. Later launches are healthy.
    pub fn first_browser_pages(self, pages: usize) -> Self {
        self.state.lock().unwrap().first_browser_pages = Some(pages);
        self
    }

    /// The `nth` navigation of the run fails with a lifecycle error.
    pub fn fatal_navigation(self, nth: usize) -> Self {
        self.state.lock().unwrap().fatal_navigation = Some(nth);
        self
    }

    /// No Chrome binary can be found.
    pub fn missing_chrome(self) -> Self {
        self.state.lock().unwrap().missing_chrome = true;
        self
    }

    /// Marks the open browser as disconnected.
    pub fn crash_browser(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(id) = state.open_browser {
            state.dead_browsers.push(id);
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn current_url(&self, page: PageHandle) -> Result<Option<String>> {
        self.state
            .lock()
            .unwrap()
            .pages
            .get(&page.0)
            .cloned()
            .ok_or(ScreenshotError::NoActivePage)
    }
}

#[async_trait::async_trait]
impl PageController for FakeController {
    async fn launch(&self, _options: &LaunchOptions) -> Result<BrowserHandle> {
        let mut state = self.state.lock().unwrap();
        state.launch_attempts += 1;
        if state.missing_chrome {
            return Err(ScreenshotError::ChromeNotFound);
        }
        state.next_id += 1;
        state.launches += 1;
        state.open_browser = Some(state.next_id);
        Ok(BrowserHandle(state.next_id))
    }

    async fn is_alive(&self, browser: BrowserHandle) -> bool {
        !self.state.lock().unwrap().dead_browsers.contains(&browser.0)
    }

    async fn new_page(&self, browser: BrowserHandle) -> Result<PageHandle> {
        let mut state = self.state.lock().unwrap();
        if state.open_browser != Some(browser.0) {
            return Err(ScreenshotError::BrowserNotLaunched);
        }
        let exhausted = state.launches == 1 && state.first_browser_pages == Some(0);
        if exhausted || state.dead_browsers.contains(&browser.0) {
            return Err(ScreenshotError::General(
                "Failed to create page: channel closed".into(),
            ));
        }
        if state.launches == 1
            && let Some(left) = state.first_browser_pages.as_mut()
        {
            *left -= 1;
        }
        state.next_id += 1;
        let id = state.next_id;
        state.pages.insert(id, None);
        Ok(PageHandle(id))
    }

    async fn set_viewport(&self, page: PageHandle, viewport: &Viewport) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .viewports
            .push((page.0, viewport.width));
        Ok(())
    }

    async fn set_user_agent(&self, _page: PageHandle, user_agent: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .user_agents
            .push(user_agent.to_string());
        Ok(())
    }

    async fn navigate(&self, page: PageHandle, url: &str, _options: &NavigateOptions) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.pages.contains_key(&page.0) {
            return Err(ScreenshotError::NoActivePage);
        }
        state.navigations.push(url.to_string());
        if state.fatal_navigation == Some(state.navigations.len()) {
            return Err(ScreenshotError::NoActivePage);
        }

        let failing = state
            .navigation_failures
            .iter_mut()
            .find(|(pattern, remaining)| url.contains(pattern.as_str()) && **remaining > 0);
        if let Some((_, remaining)) = failing {
            *remaining -= 1;
            return Err(ScreenshotError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".into(),
            });
        }

        state.pages.insert(page.0, Some(page_key(url)));
        Ok(())
    }

    async fn wait_for_any(
        &self,
        page: PageHandle,
        _selectors: &[&str],
        _timeout: Duration,
    ) -> Result<bool> {
        let url = self.current_url(page)?;
        Ok(url.is_some_and(|u| self.dom.contains_key(&u)))
    }

    async fn query_links(&self, page: PageHandle, selector: &str) -> Result<Vec<String>> {
        let Some(url) = self.current_url(page)? else {
            return Ok(Vec::new());
        };
        Ok(self
            .dom
            .get(&url)
            .and_then(|selectors| selectors.get(selector))
            .cloned()
            .unwrap_or_default())
    }

    async fn capture_full_page(&self, page: PageHandle, path: &Path) -> Result<()> {
        self.current_url(page)?;
        {
            let mut state = self.state.lock().unwrap();
            if state.capture_failures > 0 {
                state.capture_failures -= 1;
                return Err(ScreenshotError::ScreenshotFailed("detached frame".into()));
            }
            state.captures.push(path.to_path_buf());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"\x89PNG fake")?;
        Ok(())
    }

    async fn reset_browser_state(&self, _browser: BrowserHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_flush {
            return Err(ScreenshotError::General("flush unsupported".into()));
        }
        state.flushes += 1;
        Ok(())
    }

    async fn close_page(&self, page: PageHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.pages.remove(&page.0).is_some() {
            state.closed_pages += 1;
        }
        Ok(())
    }

    async fn close_browser(&self, browser: BrowserHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.open_browser == Some(browser.0) {
            state.open_browser = None;
            state.closed_browsers += 1;
            state.pages.clear();
        }
        Ok(())
    }
}
