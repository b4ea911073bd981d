pub mod generic;
pub mod horoshop;
pub mod selectors;

use crate::chrome::{NavigateOptions, PageController, PageHandle};
use crate::task::PageType;
use crate::timeouts::ms;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use generic::GenericStrategy;
pub use horoshop::HoroshopStrategy;
pub use selectors::{SelectorGroup, filter_candidates};

/// URLs resolved for one site. A product URL only exists alongside a
/// category URL, since products are looked up on the category page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_url: Option<String>,
}

impl DiscoveryResult {
    pub fn base_only(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            category_url: None,
            product_url: None,
        }
    }

    pub fn with_category(base_url: impl Into<String>, category_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            category_url: Some(category_url.into()),
            product_url: None,
        }
    }

    pub fn with_product(mut self, product_url: impl Into<String>) -> Self {
        if self.category_url.is_some() {
            self.product_url = Some(product_url.into());
        }
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn category_url(&self) -> Option<&str> {
        self.category_url.as_deref()
    }

    pub fn product_url(&self) -> Option<&str> {
        self.product_url.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.product_url.is_some()
    }

    pub fn url_for(&self, page_type: PageType) -> Option<&str> {
        match page_type {
            PageType::Home => Some(&self.base_url),
            PageType::Category => self.category_url(),
            PageType::Product => self.product_url(),
        }
    }

    /// Base URL followed by whatever was resolved.
    pub fn urls(&self) -> Vec<&str> {
        std::iter::once(self.base_url.as_str())
            .chain(self.category_url.as_deref())
            .chain(self.product_url.as_deref())
            .collect()
    }
}

/// DOM access handed to strategies: one live page and the waits to use on it.
pub struct DomProbe<'a> {
    controller: &'a dyn PageController,
    page: PageHandle,
    wait: Duration,
    navigation_timeout: Duration,
}

impl<'a> DomProbe<'a> {
    pub fn new(controller: &'a dyn PageController, page: PageHandle) -> Self {
        Self {
            controller,
            page,
            wait: Duration::from_millis(ms::DISCOVERY_WAIT),
            navigation_timeout: Duration::from_secs(crate::timeouts::secs::NAVIGATION),
        }
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.controller
            .navigate(self.page, url, &NavigateOptions::new(self.navigation_timeout))
            .await
    }

    /// Waits for any of `selectors`; a timeout is not an error.
    pub async fn wait_for_any(&self, selectors: &[&str]) -> Result<bool> {
        let found = self
            .controller
            .wait_for_any(self.page, selectors, self.wait)
            .await?;

        if !found {
            tracing::debug!(
                "None of {} ready selector(s) appeared within {}ms, continuing",
                selectors.len(),
                self.wait.as_millis()
            );
        }
        Ok(found)
    }

    /// First usable link of the first group that has one.
    pub async fn first_candidate(
        &self,
        groups: &[SelectorGroup],
        base_url: &str,
    ) -> Result<Option<String>> {
        for group in groups {
            let mut links = Vec::new();
            for selector in group.selectors {
                links.extend(self.controller.query_links(self.page, selector).await?);
            }

            if let Some(found) = filter_candidates(&links, base_url).into_iter().next() {
                tracing::debug!("Selector group '{}' matched {}", group.name, found);
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

#[async_trait::async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Higher runs first.
    fn priority(&self) -> i32;

    fn can_handle(&self, base_url: &str) -> bool;

    async fn discover_urls(&self, base_url: &str, probe: &DomProbe<'_>) -> Result<DiscoveryResult>;
}

static FALLBACK: GenericStrategy = GenericStrategy;

/// Strategies ordered by descending priority; ties keep registration order.
pub struct DiscoveryChain {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl DiscoveryChain {
    pub fn new(mut strategies: Vec<Box<dyn DiscoveryStrategy>>) -> Self {
        strategies.sort_by_key(|s| std::cmp::Reverse(s.priority()));
        Self { strategies }
    }

    /// Catalog-aware strategy for the known hosts plus the generic fallback.
    pub fn with_defaults(extra_hosts: &[String]) -> Self {
        Self::new(vec![
            Box::new(HoroshopStrategy::new().with_hosts(extra_hosts.iter().cloned())),
            Box::new(GenericStrategy),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn select(&self, base_url: &str) -> &dyn DiscoveryStrategy {
        self.strategies
            .iter()
            .find(|s| s.can_handle(base_url))
            .map(|s| s.as_ref())
            .unwrap_or(&FALLBACK)
    }

    /// Runs the selected strategy. A failed walk yields `Ok(None)` and callers
    /// fall back to the base URL; fatal lifecycle errors are returned as is.
    pub async fn discover(
        &self,
        base_url: &str,
        probe: &DomProbe<'_>,
    ) -> Result<Option<DiscoveryResult>> {
        let strategy = self.select(base_url);
        tracing::debug!("Discovering {} with '{}' strategy", base_url, strategy.name());

        match strategy.discover_urls(base_url, probe).await {
            Ok(result) => Ok(Some(result)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("Discovery for {} failed: {}", base_url, e);
                Ok(None)
            }
        }
    }

    /// Like [`discover`](Self::discover) but falls back to the base URL when
    /// the walk fails.
    pub async fn discover_or_base(
        &self,
        base_url: &str,
        probe: &DomProbe<'_>,
    ) -> Result<DiscoveryResult> {
        Ok(self
            .discover(base_url, probe)
            .await?
            .unwrap_or_else(|| DiscoveryResult::base_only(base_url)))
    }
}

impl Default for DiscoveryChain {
    fn default() -> Self {
        Self::with_defaults(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, i32, bool);

    #[async_trait::async_trait]
    impl DiscoveryStrategy for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn priority(&self) -> i32 {
            self.1
        }

        fn can_handle(&self, _base_url: &str) -> bool {
            self.2
        }

        async fn discover_urls(&self, base_url: &str, _probe: &DomProbe<'_>) -> Result<DiscoveryResult> {
            Ok(DiscoveryResult::base_only(base_url))
        }
    }

    #[test]
    fn test_product_requires_category() {
        let result = DiscoveryResult::base_only("https://a.test").with_product("https://a.test/p");
        assert_eq!(result.product_url(), None);

        let result = DiscoveryResult::with_category("https://a.test", "https://a.test/c")
            .with_product("https://a.test/p");
        assert!(result.is_complete());
        assert_eq!(
            result.urls(),
            vec!["https://a.test", "https://a.test/c", "https://a.test/p"]
        );
        assert_eq!(result.url_for(PageType::Home), Some("https://a.test"));
    }

    #[test]
    fn test_chain_sorts_by_priority_stably() {
        let chain = DiscoveryChain::new(vec![
            Box::new(Fixed("low", 1, true)),
            Box::new(Fixed("first-high", 5, true)),
            Box::new(Fixed("second-high", 5, true)),
        ]);
        assert_eq!(chain.strategy_names(), vec!["first-high", "second-high", "low"]);
        assert_eq!(chain.select("https://a.test").name(), "first-high");
    }

    #[test]
    fn test_chain_skips_strategies_that_cannot_handle() {
        let chain = DiscoveryChain::new(vec![
            Box::new(Fixed("picky", 50, false)),
            Box::new(Fixed("easy", 2, true)),
        ]);
        assert_eq!(chain.select("https://a.test").name(), "easy");
    }

    #[test]
    fn test_empty_chain_falls_back_to_generic() {
        let chain = DiscoveryChain::new(Vec::new());
        assert_eq!(chain.select("https://a.test").name(), "generic");
    }

    #[test]
    fn test_default_chain_routes_by_host() {
        let chain = DiscoveryChain::with_defaults(&["shop.example".to_string()]);
        assert_eq!(chain.select("https://demo.horoshop.ua").name(), "horoshop");
        assert_eq!(chain.select("https://shop.example/").name(), "horoshop");
        assert_eq!(chain.select("https://other.test").name(), "generic");
    }
}
