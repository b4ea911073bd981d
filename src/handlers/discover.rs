use crate::chrome::{BrowserSessionManager, ChromeController, PageController};
use crate::config::Config;
use crate::devices;
use crate::discovery::{DiscoveryChain, DiscoveryResult, DomProbe};
use crate::output::{self, text};
use crate::{Result, ScreenshotError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResult {
    pub strategy: String,
    pub device: String,
    #[serde(flatten)]
    pub result: DiscoveryResult,
}

impl output::OutputFormatter for DiscoverResult {
    fn format_text(&self) -> String {
        let found = |url: Option<&str>| match url {
            Some(url) => text::success(url),
            None => text::warning("not found"),
        };

        format!(
            "{}\n{}\n{}\n{}\n  Category: {}\n  Product:  {}",
            text::section("Discovery"),
            text::key_value("Strategy", &self.strategy),
            text::key_value("Device", &self.device),
            text::key_value("Base URL", self.result.base_url()),
            found(self.result.category_url()),
            found(self.result.product_url()),
        )
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

/// Runs the discovery chain once against `base_url` on a fresh session.
pub async fn discover_with(
    controller: Arc<dyn PageController>,
    config: &Config,
    base_url: &str,
    device: &str,
) -> Result<DiscoverResult> {
    let parsed =
        url::Url::parse(base_url).map_err(|e| ScreenshotError::InvalidUrl(format!("{}: {}", base_url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScreenshotError::InvalidUrl(base_url.to_string()));
    }

    let profile = devices::resolve_profile(device, &BTreeMap::new())?;
    let chain = DiscoveryChain::with_defaults(&config.discovery.extra_hosts);
    let strategy = chain.select(base_url).name().to_string();

    let session = BrowserSessionManager::new(controller, config.session_config());

    let discovered = async {
        let page = session
            .create_page(&profile.name, &profile.viewport, &profile.user_agent)
            .await?;
        let probe = DomProbe::new(&**session.controller(), page)
            .with_wait(Duration::from_millis(config.performance.discovery_wait_ms))
            .with_navigation_timeout(session.config().navigation_timeout);
        chain.discover_or_base(base_url, &probe).await
    }
    .await;

    if let Err(e) = session.cleanup().await {
        tracing::warn!("Failed to close browser cleanly: {}", e);
    }

    Ok(DiscoverResult {
        strategy,
        device: profile.name,
        result: discovered?,
    })
}

pub async fn handle_discover(config: &Config, base_url: &str, device: &str) -> Result<DiscoverResult> {
    let controller = Arc::new(ChromeController::new(Duration::from_millis(
        config.performance.settle_delay_ms,
    )));
    discover_with(controller, config, base_url, device).await
}
