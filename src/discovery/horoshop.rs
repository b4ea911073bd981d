use super::selectors::{CATEGORY_GROUPS, MENU_READY, PRODUCT_GROUPS, PRODUCT_GRID_READY};
use super::{DiscoveryResult, DiscoveryStrategy, DomProbe};
use crate::Result;
use url::Url;

const HOROSHOP_DOMAIN: &str = "horoshop.ua";

/// Menu-then-catalog walk for storefronts built on the Horoshop platform.
///
/// Opens the base page, takes the first category link from the ranked menu
/// groups, then opens that category and takes the first product link from
/// the product groups.
#[derive(Debug, Clone)]
pub struct HoroshopStrategy {
    hosts: Vec<String>,
}

impl HoroshopStrategy {
    pub fn new() -> Self {
        Self {
            hosts: vec![HOROSHOP_DOMAIN.to_string()],
        }
    }

    /// Extra hosts (custom domains of platform stores) this strategy accepts.
    pub fn with_hosts(mut self, hosts: impl IntoIterator<Item = String>) -> Self {
        self.hosts.extend(
            hosts
                .into_iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty()),
        );
        self
    }
}

impl Default for HoroshopStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DiscoveryStrategy for HoroshopStrategy {
    fn name(&self) -> &str {
        "horoshop"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn can_handle(&self, base_url: &str) -> bool {
        let Some(host) = Url::parse(base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        else {
            return false;
        };

        self.hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
    }

    async fn discover_urls(&self, base_url: &str, probe: &DomProbe<'_>) -> Result<DiscoveryResult> {
        probe.navigate(base_url).await?;
        probe.wait_for_any(MENU_READY).await?;

        let Some(category) = probe.first_candidate(CATEGORY_GROUPS, base_url).await? else {
            tracing::debug!("No category link found on {}", base_url);
            return Ok(DiscoveryResult::base_only(base_url));
        };

        probe.navigate(&category).await?;
        probe.wait_for_any(PRODUCT_GRID_READY).await?;

        let result = DiscoveryResult::with_category(base_url, category.clone());
        match probe.first_candidate(PRODUCT_GROUPS, base_url).await? {
            Some(product) => Ok(result.with_product(product)),
            None => {
                tracing::debug!("No product link found on {}", category);
                Ok(result)
            }
        }
    }
}
