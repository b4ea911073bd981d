use crate::Result;
use crate::devices::Viewport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Opaque reference to a browser process owned by a [`PageController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrowserHandle(pub u64);

/// Opaque reference to a page (tab) owned by a [`PageController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle(pub u64);

impl fmt::Display for BrowserHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "browser#{}", self.0)
    }
}

impl fmt::Display for PageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchOptions {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
}

#[derive(Debug, Clone, Copy)]
pub struct NavigateOptions {
    pub wait_until: WaitUntil,
    pub timeout: Duration,
}

impl NavigateOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            wait_until: WaitUntil::Load,
            timeout,
        }
    }
}

/// Everything the orchestration core needs from a browser engine.
///
/// Implemented for Chrome by [`super::ChromeController`]; tests provide
/// in-memory doubles.
#[async_trait::async_trait]
pub trait PageController: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<BrowserHandle>;

    /// Whether the process behind `browser` is still connected.
    async fn is_alive(&self, _browser: BrowserHandle) -> bool {
        true
    }

    async fn new_page(&self, browser: BrowserHandle) -> Result<PageHandle>;

    async fn set_viewport(&self, page: PageHandle, viewport: &Viewport) -> Result<()>;

    async fn set_user_agent(&self, page: PageHandle, user_agent: &str) -> Result<()>;

    async fn navigate(&self, page: PageHandle, url: &str, options: &NavigateOptions)
    -> Result<()>;

    /// Polls until any selector in `selectors` matches, or the timeout passes.
    /// Returns whether a match was seen.
    async fn wait_for_any(
        &self,
        page: PageHandle,
        selectors: &[&str],
        timeout: Duration,
    ) -> Result<bool>;

    /// Absolute `href` values of the anchors matching `selector`, in document order.
    async fn query_links(&self, page: PageHandle, selector: &str) -> Result<Vec<String>>;

    async fn capture_full_page(&self, page: PageHandle, path: &Path) -> Result<()>;

    /// Removes matching elements from the page; returns how many went away.
    async fn remove_elements(&self, _page: PageHandle, _selectors: &[String]) -> Result<usize> {
        Ok(0)
    }

    /// Drops cookies, cache and storage without restarting the process.
    async fn reset_browser_state(&self, _browser: BrowserHandle) -> Result<()> {
        Err(crate::ScreenshotError::General(
            "In-place state reset is not supported by this controller".into(),
        ))
    }

    async fn close_page(&self, page: PageHandle) -> Result<()>;

    async fn close_browser(&self, browser: BrowserHandle) -> Result<()>;
}
