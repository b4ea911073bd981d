mod common;

use common::FakeController;
use site_screenshooter::PageType;
use site_screenshooter::chrome::{LaunchOptions, PageController, PageHandle};
use site_screenshooter::discovery::{DiscoveryChain, DiscoveryStrategy, DomProbe};
use std::time::Duration;

const SHOP: &str = "https://shop.horoshop.ua";

async fn open_page(controller: &FakeController) -> PageHandle {
    let browser = controller.launch(&LaunchOptions::default()).await.unwrap();
    controller.new_page(browser).await.unwrap()
}

fn probe(controller: &FakeController, page: PageHandle) -> DomProbe<'_> {
    DomProbe::new(controller, page)
        .with_wait(Duration::from_millis(10))
        .with_navigation_timeout(Duration::from_secs(1))
}

#[tokio::test]
async fn test_menu_then_catalog_walk() {
    let controller = FakeController::new()
        .with_dom(SHOP, "a.products-menu__title-link", &["/catalog/shoes"])
        .with_dom(SHOP, r#"nav a[href*="/"]"#, &["/about"])
        .with_dom(
            "https://shop.horoshop.ua/catalog/shoes",
            ".catalogCard-title a[href]",
            &["/shoes/red-sneaker"],
        );
    let page = open_page(&controller).await;

    let result = DiscoveryChain::default()
        .discover(SHOP, &probe(&controller, page))
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(result.base_url(), SHOP);
    assert_eq!(
        result.url_for(PageType::Category),
        Some("https://shop.horoshop.ua/catalog/shoes")
    );
    assert_eq!(
        result.url_for(PageType::Product),
        Some("https://shop.horoshop.ua/shoes/red-sneaker")
    );
    assert_eq!(controller.state().navigations.len(), 2);
}

#[tokio::test]
async fn test_generic_menu_skips_placeholder_links() {
    let controller = FakeController::new().with_dom(
        SHOP,
        r#"nav a[href*="/"]"#,
        &["#", "javascript:void(0)", "https://other.test/catalog", "/catalog/bags"],
    );
    let page = open_page(&controller).await;

    let result = DiscoveryChain::default()
        .discover(SHOP, &probe(&controller, page))
        .await
        .unwrap()
        .unwrap();

    // No product grid on the category page: category only.
    assert!(!result.is_complete());
    assert_eq!(
        result.category_url(),
        Some("https://shop.horoshop.ua/catalog/bags")
    );
    assert_eq!(result.product_url(), None);
    assert_eq!(result.urls().len(), 2);
}

#[tokio::test]
async fn test_no_menu_yields_base_only() {
    let controller = FakeController::new();
    let page = open_page(&controller).await;

    let result = DiscoveryChain::default()
        .discover(SHOP, &probe(&controller, page))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.url_for(PageType::Home), Some(SHOP));
    assert_eq!(result.category_url(), None);
    assert_eq!(controller.state().navigations.len(), 1);
}

#[tokio::test]
async fn test_navigation_error_falls_back_to_base() {
    let controller = FakeController::new().fail_navigation("horoshop.ua", 2);
    let page = open_page(&controller).await;
    let chain = DiscoveryChain::default();

    let discovered = chain.discover(SHOP, &probe(&controller, page)).await.unwrap();
    assert!(discovered.is_none());

    let result = chain
        .discover_or_base(SHOP, &probe(&controller, page))
        .await
        .unwrap();
    assert_eq!(result.urls(), vec![SHOP]);
}

#[tokio::test]
async fn test_lifecycle_errors_escape_discovery() {
    use site_screenshooter::ScreenshotError;

    let controller = FakeController::new();
    let closed = PageHandle(404);
    let chain = DiscoveryChain::default();

    let err = chain
        .discover(SHOP, &probe(&controller, closed))
        .await
        .unwrap_err();
    assert!(matches!(err, ScreenshotError::NoActivePage));

    let err = chain
        .discover_or_base(SHOP, &probe(&controller, closed))
        .await
        .unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_other_hosts_use_generic_strategy() {
    let controller = FakeController::new();
    let page = open_page(&controller).await;
    let chain = DiscoveryChain::default();

    assert_eq!(chain.select("https://acme.test").name(), "generic");
    assert_eq!(chain.select(SHOP).name(), "horoshop");

    let result = chain
        .discover("https://acme.test", &probe(&controller, page))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.urls(), vec!["https://acme.test"]);
    assert!(controller.state().navigations.is_empty());
}

#[tokio::test]
async fn test_extra_hosts_select_catalog_strategy() {
    let chain = DiscoveryChain::with_defaults(&["shop.example".to_string()]);
    assert_eq!(chain.select("https://www.shop.example/").name(), "horoshop");
    assert_eq!(chain.strategy_names(), vec!["horoshop", "generic"]);
}

#[tokio::test]
async fn test_discover_command_closes_its_browser() {
    use site_screenshooter::ScreenshotError;
    use site_screenshooter::config::Config;
    use site_screenshooter::handlers::discover::discover_with;
    use std::sync::Arc;

    let controller = Arc::new(FakeController::new().with_dom(
        SHOP,
        r#"a[href*="/catalog/"]"#,
        &["https://shop.horoshop.ua/catalog/hats"],
    ));
    let mut config = Config::default();
    config.performance.discovery_wait_ms = 10;

    let found = discover_with(controller.clone(), &config, SHOP, "mobile")
        .await
        .unwrap();
    assert_eq!(found.strategy, "horoshop");
    assert_eq!(found.device, "mobile");
    assert_eq!(
        found.result.category_url(),
        Some("https://shop.horoshop.ua/catalog/hats")
    );

    {
        let state = controller.state();
        assert_eq!(state.launches, 1);
        assert_eq!(state.closed_browsers, 1);
        assert_eq!(state.viewports[0].1, 375);
    }

    let err = discover_with(controller, &config, "ftp://shop.horoshop.ua", "desktop")
        .await
        .unwrap_err();
    assert!(matches!(err, ScreenshotError::InvalidUrl(_)));
}
