use super::{DiscoveryResult, DiscoveryStrategy, DomProbe};
use crate::Result;

/// Handles every site and resolves nothing beyond the base URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericStrategy;

#[async_trait::async_trait]
impl DiscoveryStrategy for GenericStrategy {
    fn name(&self) -> &str {
        "generic"
    }

    fn priority(&self) -> i32 {
        1
    }

    fn can_handle(&self, _base_url: &str) -> bool {
        true
    }

    async fn discover_urls(&self, base_url: &str, _probe: &DomProbe<'_>) -> Result<DiscoveryResult> {
        Ok(DiscoveryResult::base_only(base_url))
    }
}
