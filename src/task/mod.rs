pub mod matrix;
pub mod url;

use crate::devices::Viewport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use matrix::{TaskFilter, build_tasks, generate_matrix, order_by_device};

/// Language code that addresses a site without any prefix.
pub const DEFAULT_LANGUAGE: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Home,
    Category,
    Product,
}

impl PageType {
    pub const ALL: [PageType; 3] = [PageType::Home, PageType::Category, PageType::Product];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Category => "category",
            Self::Product => "product",
        }
    }

    /// Path used when the site does not configure this page type.
    ///
    /// Only the home page has a universal address; anything else is left to
    /// discovery.
    pub fn default_path(&self) -> Option<&'static str> {
        match self {
            Self::Home => Some("/"),
            Self::Category | Self::Product => None,
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = crate::ScreenshotError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "category" => Ok(Self::Category),
            "product" => Ok(Self::Product),
            other => Err(crate::ScreenshotError::ConfigError(format!(
                "Unknown page type: {}. Use home, category, or product",
                other
            ))),
        }
    }
}

/// Where a task navigates: a site-relative path, or whatever discovery finds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "path")]
pub enum Target {
    Path(String),
    Auto,
}

impl Target {
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Path(p) => Some(p),
            Self::Auto => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => f.write_str(p),
            Self::Auto => f.write_str("auto"),
        }
    }
}

/// One unit of work: a single screenshot of one page, in one language, on one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotTask {
    pub site_name: String,
    pub base_url: String,
    pub language: String,
    pub device: String,
    pub page_type: PageType,
    /// Already carries the language prefix when it is a concrete path.
    pub target: Target,
    pub viewport: Viewport,
    pub user_agent: String,
}

impl ScreenshotTask {
    pub fn label(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.site_name, self.language, self.device, self.page_type
        )
    }
}
