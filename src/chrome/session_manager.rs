use super::controller::{
    BrowserHandle, LaunchOptions, NavigateOptions, PageController, PageHandle,
};
use crate::devices::Viewport;
use crate::runner::observer::{NoopObserver, RunObserver};
use crate::{Result, ScreenshotError, timeouts::secs};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// What happens to the browser when consecutive tasks use different devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceSwitchPolicy {
    /// Close the process and start a new one with a fresh profile.
    #[default]
    Relaunch,
    /// Keep the process, drop cookies, cache and storage in place.
    /// Falls back to a relaunch when the flush fails.
    FlushOnly,
}

impl std::str::FromStr for DeviceSwitchPolicy {
    type Err = ScreenshotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relaunch" => Ok(Self::Relaunch),
            "flush-only" | "flush" => Ok(Self::FlushOnly),
            other => Err(ScreenshotError::ConfigError(format!(
                "Unknown device switch policy: {}. Use relaunch or flush-only",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub launch: LaunchOptions,
    pub policy: DeviceSwitchPolicy,
    pub navigation_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            launch: LaunchOptions::default(),
            policy: DeviceSwitchPolicy::default(),
            navigation_timeout: Duration::from_secs(secs::NAVIGATION),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    browser: Option<BrowserHandle>,
    current_device: Option<String>,
    page: Option<PageHandle>,
}

/// Owns the single browser of a run and the single page inside it.
///
/// The browser is bound to one device at a time. Asking for a page on a
/// different device tears the browser down and launches a new one before the
/// page is created, so user agent, viewport, cookies and storage never carry
/// over between device profiles.
pub struct BrowserSessionManager {
    controller: Arc<dyn PageController>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    launches: AtomicUsize,
    relaunches: AtomicUsize,
    observer: Arc<dyn RunObserver>,
}

impl BrowserSessionManager {
    pub fn new(controller: Arc<dyn PageController>, config: SessionConfig) -> Self {
        Self {
            controller,
            config,
            state: Mutex::new(SessionState::default()),
            launches: AtomicUsize::new(0),
            relaunches: AtomicUsize::new(0),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn controller(&self) -> &Arc<dyn PageController> {
        &self.controller
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Total browser processes started, including relaunches.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::Relaxed)
    }

    /// Launches caused by a device boundary.
    pub fn relaunches(&self) -> usize {
        self.relaunches.load(Ordering::Relaxed)
    }

    pub async fn is_open(&self) -> bool {
        self.state.lock().await.browser.is_some()
    }

    pub async fn current_device(&self) -> Option<String> {
        self.state.lock().await.current_device.clone()
    }

    /// Starts the browser if none is running. The session is unbound to any
    /// device until the first page is created.
    pub async fn launch(&self) -> Result<BrowserHandle> {
        let mut state = self.state.lock().await;
        self.ensure_browser(&mut state).await
    }

    async fn ensure_browser(&self, state: &mut SessionState) -> Result<BrowserHandle> {
        if let Some(browser) = state.browser {
            if self.controller.is_alive(browser).await {
                return Ok(browser);
            }
            tracing::warn!("Browser {} lost its connection, relaunching", browser);
            self.discard_browser(state).await;
        }

        let browser = self.controller.launch(&self.config.launch).await?;
        self.launches.fetch_add(1, Ordering::Relaxed);
        state.browser = Some(browser);
        state.current_device = None;

        tracing::debug!("Browser {} launched", browser);
        Ok(browser)
    }

    async fn release_browser(&self, state: &mut SessionState) -> Result<()> {
        if let Some(page) = state.page.take() {
            self.controller.close_page(page).await.ok();
        }
        state.current_device = None;

        match state.browser.take() {
            Some(browser) => self.controller.close_browser(browser).await,
            None => Ok(()),
        }
    }

    /// Best-effort teardown of a browser that can no longer be trusted. The
    /// next page request launches a new one.
    async fn discard_browser(&self, state: &mut SessionState) {
        if let Err(e) = self.release_browser(state).await {
            tracing::debug!("Failed to close discarded browser: {}", e);
        }
    }

    async fn switch_device(&self, state: &mut SessionState, from: &str, to: &str) -> Result<()> {
        if self.config.policy == DeviceSwitchPolicy::FlushOnly
            && let Some(browser) = state.browser
        {
            if let Some(page) = state.page.take() {
                self.controller.close_page(page).await.ok();
            }

            match self.controller.reset_browser_state(browser).await {
                Ok(()) => {
                    tracing::debug!("Flushed browser state for {} -> {}", from, to);
                    return Ok(());
                }
                Err(e) => tracing::warn!("State flush failed ({}), relaunching instead", e),
            }
        }

        if let Err(e) = self.release_browser(state).await {
            tracing::warn!("Failed to close browser before relaunch: {}", e);
        }
        self.ensure_browser(state).await?;
        self.relaunches.fetch_add(1, Ordering::Relaxed);
        self.observer.on_relaunch(from, to);
        Ok(())
    }

    /// Opens the page for `device`, relaunching the browser first when the
    /// session is bound to another device. Any page left open is closed.
    ///
    /// A browser that fails to open or prepare a page is dropped, so the
    /// next call starts a fresh process.
    pub async fn create_page(
        &self,
        device: &str,
        viewport: &Viewport,
        user_agent: &str,
    ) -> Result<PageHandle> {
        let mut state = self.state.lock().await;

        if let Some(page) = state.page.take() {
            self.controller.close_page(page).await.ok();
        }

        self.ensure_browser(&mut state).await?;

        if let Some(current) = state.current_device.clone()
            && current != device
        {
            self.switch_device(&mut state, &current, device).await?;
        }
        state.current_device = Some(device.to_string());

        let browser = state.browser.ok_or(ScreenshotError::BrowserNotLaunched)?;
        let page = match self.controller.new_page(browser).await {
            Ok(page) => page,
            Err(e) => {
                if !e.is_fatal() {
                    tracing::warn!("Browser {} could not open a page ({}), dropping it", browser, e);
                    self.discard_browser(&mut state).await;
                }
                return Err(e);
            }
        };

        let prepared = async {
            self.controller.set_viewport(page, viewport).await?;
            self.controller.set_user_agent(page, user_agent).await
        }
        .await;

        if let Err(e) = prepared {
            self.controller.close_page(page).await.ok();
            if !e.is_fatal() {
                self.discard_browser(&mut state).await;
            }
            return Err(e);
        }

        state.page = Some(page);
        Ok(page)
    }

    pub async fn active_page(&self) -> Result<PageHandle> {
        self.state
            .lock()
            .await
            .page
            .ok_or(ScreenshotError::NoActivePage)
    }

    pub async fn navigate_to(&self, url: &str) -> Result<()> {
        let page = self.active_page().await?;
        self.controller
            .navigate(page, url, &NavigateOptions::new(self.config.navigation_timeout))
            .await
    }

    /// Removes `hide` selectors from the active page, then captures it to `path`.
    pub async fn capture(&self, path: &Path, hide: &[String]) -> Result<()> {
        let page = self.active_page().await?;

        if !hide.is_empty() {
            match self.controller.remove_elements(page, hide).await {
                Ok(removed) if removed > 0 => tracing::debug!("Removed {} element(s)", removed),
                Ok(_) => {}
                Err(e) => tracing::debug!("Element removal skipped: {}", e),
            }
        }

        self.controller.capture_full_page(page, path).await
    }

    /// Closes the active page, if any.
    pub async fn close_page(&self) -> Result<()> {
        let page = self.state.lock().await.page.take();
        match page {
            Some(page) => self.controller.close_page(page).await,
            None => Ok(()),
        }
    }

    /// Closes page and browser and returns to the closed state. Safe to call
    /// any number of times.
    pub async fn cleanup(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.browser.is_none() && state.page.is_none() {
            return Ok(());
        }

        let result = self.release_browser(&mut state).await;
        tracing::debug!("Browser session closed");
        result
    }
}
