use super::controller::{
    BrowserHandle, LaunchOptions, NavigateOptions, PageController, PageHandle, WaitUntil,
};
use crate::devices::Viewport;
use crate::{
    Result, ScreenshotError, js_templates,
    timeouts::{ms, secs},
};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCacheParams, ClearBrowserCookiesParams, Headers, SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, NavigateParams};
use chromiumoxide::cdp::browser_protocol::storage::ClearDataForOriginParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Flags the screenshot runs have always launched Chrome with; they keep it
/// stable inside containers and CI runners.
const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
];

struct BrowserEntry {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
    origins: HashSet<String>,
}

#[derive(Clone)]
struct PageEntry {
    page: Page,
    browser: u64,
}

/// [`PageController`] backed by a locally launched Chrome over CDP.
pub struct ChromeController {
    browsers: RwLock<HashMap<u64, BrowserEntry>>,
    pages: RwLock<HashMap<u64, PageEntry>>,
    next_id: AtomicU64,
    settle: Duration,
}

impl ChromeController {
    pub fn new(settle: Duration) -> Self {
        Self {
            browsers: RwLock::new(HashMap::new()),
            pages: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            settle,
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn page(&self, handle: PageHandle) -> Result<PageEntry> {
        self.pages
            .read()
            .await
            .get(&handle.0)
            .cloned()
            .ok_or(ScreenshotError::NoActivePage)
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(page: &Page, script: String) -> Result<T> {
        page.evaluate(script)
            .await
            .map_err(|e| ScreenshotError::EvaluationError(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| ScreenshotError::EvaluationError(e.to_string()))
    }

    async fn wait_for_ready_state(page: &Page, wait_until: WaitUntil, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, async {
            let mut stable_count = 0;

            loop {
                let state = tokio::time::timeout(
                    Duration::from_secs(5),
                    page.evaluate(js_templates::READY_STATE),
                )
                .await
                .ok()
                .and_then(|r| r.ok())
                .and_then(|v| v.into_value::<String>().ok());

                match (wait_until, state.as_deref()) {
                    (WaitUntil::DomContentLoaded, Some("interactive" | "complete")) => return,
                    (WaitUntil::Load, Some("complete")) => {
                        stable_count += 1;
                        if stable_count >= 2 {
                            return;
                        }
                    }
                    _ => stable_count = 0,
                }

                tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
            }
        })
        .await
        .map_err(|_| ScreenshotError::NavigationTimeout(timeout.as_secs()))
    }
}

impl Default for ChromeController {
    fn default() -> Self {
        Self::new(Duration::from_millis(ms::PAGE_SETTLE))
    }
}

#[async_trait::async_trait]
impl PageController for ChromeController {
    async fn launch(&self, options: &LaunchOptions) -> Result<BrowserHandle> {
        let chrome_path = match options.chrome_path.clone() {
            Some(path) => path,
            None => crate::utils::find_chrome_executable()?,
        };

        let id = self.next_id();
        // A fresh profile per process: nothing from a previous device survives a relaunch.
        let profile_dir = std::env::temp_dir().join(format!(
            "site-screenshooter-{}",
            uuid::Uuid::new_v4()
        ));

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome_path)
            .user_data_dir(&profile_dir)
            .viewport(None)
            .request_timeout(Duration::from_secs(secs::REQUEST));

        if !options.headless {
            builder = builder.with_head();
        }

        for arg in LAUNCH_ARGS.iter().copied().map(String::from).chain(options.args.iter().cloned()) {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| ScreenshotError::LaunchFailed(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScreenshotError::LaunchFailed(e.to_string()))?;

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        tracing::debug!("Launched Chrome {} with profile {}", id, profile_dir.display());

        self.browsers.write().await.insert(
            id,
            BrowserEntry {
                browser,
                handler,
                profile_dir,
                origins: HashSet::new(),
            },
        );

        Ok(BrowserHandle(id))
    }

    async fn is_alive(&self, browser: BrowserHandle) -> bool {
        // The handler loop ends once the CDP connection drops.
        self.browsers
            .read()
            .await
            .get(&browser.0)
            .is_some_and(|entry| !entry.handler.is_finished())
    }

    async fn new_page(&self, browser: BrowserHandle) -> Result<PageHandle> {
        let page = {
            let browsers = self.browsers.read().await;
            let entry = browsers
                .get(&browser.0)
                .ok_or(ScreenshotError::BrowserNotLaunched)?;
            entry
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| ScreenshotError::General(format!("Failed to create page: {}", e)))?
        };

        let headers = Headers::new(serde_json::json!({
            "Cache-Control": "no-cache, no-store, must-revalidate",
            "Pragma": "no-cache",
            "Expires": "0",
        }));
        page.execute(SetExtraHttpHeadersParams::new(headers))
            .await
            .map_err(|e| ScreenshotError::General(format!("Failed to set headers: {}", e)))?;

        let id = self.next_id();
        self.pages.write().await.insert(
            id,
            PageEntry {
                page,
                browser: browser.0,
            },
        );

        Ok(PageHandle(id))
    }

    async fn set_viewport(&self, page: PageHandle, viewport: &Viewport) -> Result<()> {
        let entry = self.page(page).await?;

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width as i64)
            .height(viewport.height as i64)
            .device_scale_factor(viewport.scale_factor)
            .mobile(viewport.is_mobile)
            .build()
            .map_err(|e| ScreenshotError::General(format!("Failed to build metrics params: {}", e)))?;

        entry
            .page
            .execute(metrics)
            .await
            .map_err(|e| ScreenshotError::General(format!("Failed to set device metrics: {}", e)))?;

        let touch = SetTouchEmulationEnabledParams::builder()
            .enabled(viewport.has_touch)
            .build()
            .map_err(|e| ScreenshotError::General(format!("Failed to build touch params: {}", e)))?;

        entry
            .page
            .execute(touch)
            .await
            .map_err(|e| ScreenshotError::General(format!("Failed to set touch emulation: {}", e)))?;

        Ok(())
    }

    async fn set_user_agent(&self, page: PageHandle, user_agent: &str) -> Result<()> {
        let entry = self.page(page).await?;

        let params = SetUserAgentOverrideParams::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ScreenshotError::General(format!("Failed to build user agent params: {}", e)))?;

        entry
            .page
            .execute(params)
            .await
            .map_err(|e| ScreenshotError::General(format!("Failed to set user agent: {}", e)))?;

        Ok(())
    }

    async fn navigate(&self, page: PageHandle, url: &str, options: &NavigateOptions) -> Result<()> {
        let entry = self.page(page).await?;
        let start = Instant::now();

        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| ScreenshotError::General(format!("Failed to build navigate params: {}", e)))?;

        let response = tokio::time::timeout(options.timeout, entry.page.execute(params))
            .await
            .map_err(|_| ScreenshotError::NavigationTimeout(options.timeout.as_secs()))?
            .map_err(|e| ScreenshotError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(error_text) = response.result.error_text.clone() {
            return Err(ScreenshotError::Navigation {
                url: url.to_string(),
                reason: error_text,
            });
        }

        let remaining = options.timeout.saturating_sub(start.elapsed());
        Self::wait_for_ready_state(&entry.page, options.wait_until, remaining).await?;

        if let Ok(parsed) = url::Url::parse(url)
            && let Some(browser) = self.browsers.write().await.get_mut(&entry.browser)
        {
            browser.origins.insert(parsed.origin().ascii_serialization());
        }

        tokio::time::sleep(self.settle).await;

        tracing::debug!("Loaded {} in {}ms", url, start.elapsed().as_millis());
        Ok(())
    }

    async fn wait_for_any(
        &self,
        page: PageHandle,
        selectors: &[&str],
        timeout: Duration,
    ) -> Result<bool> {
        let entry = self.page(page).await?;
        let script = js_templates::any_selector_present(selectors);
        let deadline = Instant::now() + timeout;

        loop {
            // Evaluation can fail while the document is still being replaced; keep polling.
            let present: bool = Self::evaluate(&entry.page, script.clone())
                .await
                .unwrap_or(false);

            if present {
                return Ok(true);
            }

            if Instant::now() >= deadline {
                return Ok(false);
            }

            tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
        }
    }

    async fn query_links(&self, page: PageHandle, selector: &str) -> Result<Vec<String>> {
        let entry = self.page(page).await?;
        Self::evaluate(&entry.page, js_templates::collect_links(selector)).await
    }

    async fn capture_full_page(&self, page: PageHandle, path: &Path) -> Result<()> {
        let entry = self.page(page).await?;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        let data = entry
            .page
            .screenshot(params)
            .await
            .map_err(|e| ScreenshotError::ScreenshotFailed(e.to_string()))?;

        let image = image::load_from_memory(&data)
            .map_err(|e| ScreenshotError::ScreenshotFailed(format!("Failed to load image: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &data)?;

        tracing::debug!(
            "Captured {}x{} ({} bytes) to {}",
            image.width(),
            image.height(),
            data.len(),
            path.display()
        );
        Ok(())
    }

    async fn remove_elements(&self, page: PageHandle, selectors: &[String]) -> Result<usize> {
        if selectors.is_empty() {
            return Ok(0);
        }
        let entry = self.page(page).await?;
        Self::evaluate(&entry.page, js_templates::remove_elements(selectors)).await
    }

    async fn reset_browser_state(&self, browser: BrowserHandle) -> Result<()> {
        let origins: Vec<String> = {
            let browsers = self.browsers.read().await;
            let entry = browsers
                .get(&browser.0)
                .ok_or(ScreenshotError::BrowserNotLaunched)?;
            entry.origins.iter().cloned().collect()
        };

        let scratch = self.new_page(browser).await?;
        let entry = self.page(scratch).await?;

        let result = async {
            entry
                .page
                .execute(ClearBrowserCookiesParams::default())
                .await
                .map_err(|e| ScreenshotError::General(format!("Failed to clear cookies: {}", e)))?;
            entry
                .page
                .execute(ClearBrowserCacheParams::default())
                .await
                .map_err(|e| ScreenshotError::General(format!("Failed to clear cache: {}", e)))?;

            for origin in &origins {
                entry
                    .page
                    .execute(ClearDataForOriginParams::new(origin.clone(), "all"))
                    .await
                    .map_err(|e| {
                        ScreenshotError::General(format!("Failed to clear storage for {}: {}", origin, e))
                    })?;
            }
            Ok::<(), ScreenshotError>(())
        }
        .await;

        self.close_page(scratch).await.ok();

        if let Some(entry) = self.browsers.write().await.get_mut(&browser.0) {
            entry.origins.clear();
        }

        result
    }

    async fn close_page(&self, page: PageHandle) -> Result<()> {
        let Some(entry) = self.pages.write().await.remove(&page.0) else {
            return Ok(());
        };

        entry
            .page
            .close()
            .await
            .map_err(|e| ScreenshotError::General(format!("Failed to close page: {}", e)))?;

        tokio::time::sleep(Duration::from_millis(ms::PAGE_CLOSE_SETTLE)).await;
        Ok(())
    }

    async fn close_browser(&self, browser: BrowserHandle) -> Result<()> {
        let owned_pages: Vec<u64> = self
            .pages
            .read()
            .await
            .iter()
            .filter(|(_, p)| p.browser == browser.0)
            .map(|(id, _)| *id)
            .collect();

        for id in owned_pages {
            self.close_page(PageHandle(id)).await.ok();
        }

        let Some(mut entry) = self.browsers.write().await.remove(&browser.0) else {
            return Ok(());
        };

        let closed = entry
            .browser
            .close()
            .await
            .map_err(|e| ScreenshotError::General(format!("Failed to close browser: {}", e)));

        if closed.is_ok() {
            entry.browser.wait().await.ok();
        }
        entry.handler.abort();

        if entry.profile_dir.exists() {
            std::fs::remove_dir_all(&entry.profile_dir).ok();
        }

        closed.map(|_| ())
    }
}
