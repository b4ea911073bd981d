use super::observer::RunObserver;
use super::retry::CaptureAttempt;
use crate::chrome::BrowserSessionManager;
use crate::discovery::{DiscoveryChain, DiscoveryResult, DomProbe};
use crate::task::url::{OutputLayout, add_device_query, apply_language_to_url, join_url, output_path};
use crate::task::{ScreenshotTask, Target};
use crate::{Result, ScreenshotError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub output_dir: PathBuf,
    pub layout: OutputLayout,
    /// Selectors removed from the page right before the screenshot.
    pub hide_selectors: Vec<String>,
    pub discovery_wait: Duration,
}

/// Discovery results per site name, kept for the whole run.
pub type DiscoveryCache = HashMap<String, DiscoveryResult>;

/// A capture attempt against the live browser session.
///
/// Each attempt opens a page on the task's device, resolves the target
/// (running discovery for `auto` targets), navigates, captures and closes
/// the page again.
pub struct SessionCapture<'a> {
    session: &'a BrowserSessionManager,
    discovery: &'a DiscoveryChain,
    cache: &'a mut DiscoveryCache,
    options: &'a CaptureOptions,
    observer: &'a dyn RunObserver,
    last_url: Option<String>,
}

impl<'a> SessionCapture<'a> {
    pub fn new(
        session: &'a BrowserSessionManager,
        discovery: &'a DiscoveryChain,
        cache: &'a mut DiscoveryCache,
        options: &'a CaptureOptions,
        observer: &'a dyn RunObserver,
    ) -> Self {
        Self {
            session,
            discovery,
            cache,
            options,
            observer,
            last_url: None,
        }
    }

    /// Address the most recent attempt resolved to, without the device query.
    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    pub fn into_last_url(self) -> Option<String> {
        self.last_url
    }

    async fn discovered(&mut self, task: &ScreenshotTask) -> Result<DiscoveryResult> {
        if let Some(cached) = self.cache.get(&task.site_name) {
            return Ok(cached.clone());
        }

        let page = self.session.active_page().await?;
        let probe = DomProbe::new(&**self.session.controller(), page)
            .with_wait(self.options.discovery_wait)
            .with_navigation_timeout(self.session.config().navigation_timeout);

        let result = match self.discovery.discover(&task.base_url, &probe).await? {
            Some(result) => {
                self.cache.insert(task.site_name.clone(), result.clone());
                result
            }
            None => DiscoveryResult::base_only(&task.base_url),
        };

        self.observer.on_discovery(&task.site_name, &result);
        Ok(result)
    }

    async fn resolve_url(&mut self, task: &ScreenshotTask) -> Result<String> {
        match &task.target {
            Target::Path(path) => Ok(join_url(&task.base_url, path)),
            Target::Auto => {
                let discovered = self.discovered(task).await?;
                match discovered.url_for(task.page_type) {
                    Some(url) => Ok(apply_language_to_url(url, &task.language)),
                    None => {
                        // Let the next attempt run discovery again.
                        self.cache.remove(&task.site_name);
                        Err(ScreenshotError::DiscoveryUnresolved {
                            site: task.site_name.clone(),
                            page_type: task.page_type.to_string(),
                        })
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl CaptureAttempt for SessionCapture<'_> {
    async fn attempt(&mut self, task: &ScreenshotTask, attempt: u32) -> Result<PathBuf> {
        tracing::debug!("{} attempt {}", task.label(), attempt);

        self.session
            .create_page(&task.device, &task.viewport, &task.user_agent)
            .await?;

        let url = self.resolve_url(task).await?;
        self.last_url = Some(url.clone());

        self.session
            .navigate_to(&add_device_query(&url, &task.device))
            .await?;

        let path = output_path(self.options.layout, &self.options.output_dir, task, &url);
        self.session
            .capture(&path, &self.options.hide_selectors)
            .await?;
        self.session.close_page().await?;

        Ok(path)
    }

    async fn abort(&mut self, _task: &ScreenshotTask) {
        if let Err(e) = self.session.close_page().await {
            tracing::debug!("Failed to close page after error: {}", e);
        }
    }
}
