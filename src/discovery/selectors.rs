//! Ranked selector groups probed during discovery, and the candidate filter
//! applied to whatever links they return.

use url::Url;

/// Selectors evaluated together; a group "hits" when any of them yields a
/// usable link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorGroup {
    pub name: &'static str,
    pub selectors: &'static [&'static str],
}

/// Any of these present means the navigation menu has rendered.
pub const MENU_READY: &[&str] = &[
    ".products-menu",
    ".menu",
    "nav",
    ".navigation",
    ".main-menu",
    ".top-menu",
    ".site-menu",
    ".header-menu",
];

/// Any of these present means a product grid has rendered.
pub const PRODUCT_GRID_READY: &[&str] = &[
    ".catalog-grid",
    ".product-list",
    ".catalog-list",
    ".products-grid",
    ".catalog-items",
    ".product-items",
    ".goods-list",
    ".items-grid",
];

/// Most specific first; generic navigation last.
pub const CATEGORY_GROUPS: &[SelectorGroup] = &[
    SelectorGroup {
        name: "theme-menu-links",
        selectors: &[
            "a.products-menu__title-link",
            "a.productsMenu-tabs-list__link",
        ],
    },
    SelectorGroup {
        name: "theme-menu-containers",
        selectors: &[
            ".products-menu__container a[href]",
            ".productsMenu-tabs-list a[href]",
        ],
    },
    SelectorGroup {
        name: "category-url-patterns",
        selectors: &[
            r#"a[href*="/category/"]"#,
            r#"a[href*="/catalog/"]"#,
            r#"a[href*="/categories/"]"#,
        ],
    },
    SelectorGroup {
        name: "generic-menu",
        selectors: &[
            r#"nav a[href*="/"]"#,
            r#".menu a[href*="/"]"#,
            r#".navigation a[href*="/"]"#,
            r#".header a[href*="/"]"#,
            r#".main-menu a[href*="/"]"#,
            r#".top-menu a[href*="/"]"#,
            r#".site-menu a[href*="/"]"#,
        ],
    },
];

pub const PRODUCT_GROUPS: &[SelectorGroup] = &[
    SelectorGroup {
        name: "theme-catalog-cards",
        selectors: &[
            ".catalogCard-image[href]",
            ".catalogCard-title a[href]",
            ".catalog-grid__item .catalogCard-image[href]",
            ".catalog-grid__item .catalogCard-title a[href]",
        ],
    },
    SelectorGroup {
        name: "product-cards",
        selectors: &[
            ".product-item a[href]",
            ".product-card a[href]",
            ".product a[href]",
            ".item a[href]",
            ".goods-item a[href]",
        ],
    },
    SelectorGroup {
        name: "product-url-patterns",
        selectors: &[
            r#"a[href*="/product/"]"#,
            r#"a[href*="/item/"]"#,
            r#"a[href*="/goods/"]"#,
        ],
    },
    SelectorGroup {
        name: "listing-items",
        selectors: &[
            ".catalog-item a[href]",
            ".product-list-item a[href]",
            ".grid-item a[href]",
        ],
    },
];

fn same_page(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
        && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
        && a.query() == b.query()
}

/// Keeps links that point somewhere else on the same site, in input order.
///
/// Drops empty values, bare `#`, `javascript:` pseudo-links, links to other
/// hosts or non-http schemes, and anything that resolves back to `base_url`
/// itself (trailing slash and fragment ignored). Relative links are resolved
/// against `base_url`.
pub fn filter_candidates(links: &[String], base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };

    links
        .iter()
        .filter_map(|raw| {
            let href = raw.trim();
            if href.is_empty() || href == "#" || href.to_ascii_lowercase().starts_with("javascript:")
            {
                return None;
            }

            let url = base.join(href).ok()?;
            if !matches!(url.scheme(), "http" | "https") || url.host_str() != base.host_str() {
                return None;
            }
            if same_page(&url, &base) {
                return None;
            }

            Some(url.to_string())
        })
        .collect()
}
