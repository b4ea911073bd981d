//! Site definitions: which sites to capture and along which axes.

use crate::devices::{self, DeviceSpec};
use crate::task::PageType;
use crate::{Result, ScreenshotError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagePaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl PagePaths {
    pub fn get(&self, page_type: PageType) -> Option<&str> {
        match page_type {
            PageType::Home => self.home.as_deref(),
            PageType::Category => self.category.as_deref(),
            PageType::Product => self.product.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub pages: PagePaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub viewport: BTreeMap<String, DeviceSpec>,
}

impl SiteConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            pages: PagePaths::default(),
            languages: None,
            devices: None,
            viewport: BTreeMap::new(),
        }
    }

    pub fn effective_languages<'a>(&'a self, defaults: &'a Defaults) -> &'a [String] {
        self.languages.as_deref().unwrap_or(&defaults.languages)
    }

    pub fn effective_devices<'a>(&'a self, defaults: &'a Defaults) -> &'a [String] {
        self.devices.as_deref().unwrap_or(&defaults.devices)
    }

    /// Defaults' viewport table with this site's entries laid over it.
    pub fn viewport_table(&self, defaults: &Defaults) -> BTreeMap<String, DeviceSpec> {
        let mut table = defaults.viewport.clone();
        table.extend(self.viewport.clone());
        table
    }

    /// Configured path, then the built-in default; `None` means discovery.
    pub fn path_for(&self, page_type: PageType) -> Option<&str> {
        self.pages
            .get(page_type)
            .or_else(|| page_type.default_path())
    }

    fn validate(&self, index: usize, defaults: &Defaults) -> Result<()> {
        let err = |msg: String| ScreenshotError::ConfigError(format!("Site #{}: {}", index, msg));

        if self.name.trim().is_empty() {
            return Err(err("\"name\" is required".into()));
        }

        let parsed = Url::parse(&self.base_url)
            .map_err(|e| err(format!("\"baseUrl\" must be a valid URL ({})", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(err(format!(
                "\"baseUrl\" must be an absolute http(s) URL, got {}",
                self.base_url
            )));
        }

        for page_type in PageType::ALL {
            if let Some(path) = self.pages.get(page_type)
                && path.trim().is_empty()
            {
                return Err(err(format!("page \"{}\" must not be empty", page_type)));
            }
        }

        check_axis(&self.languages, "languages").map_err(err)?;
        check_axis(&self.devices, "devices").map_err(err)?;

        for (device, spec) in &self.viewport {
            spec.validate(device)?;
        }

        let table = self.viewport_table(defaults);
        for device in self.effective_devices(defaults) {
            devices::resolve_profile(device, &table)?;
        }

        Ok(())
    }
}

fn check_axis(values: &Option<Vec<String>>, field: &str) -> std::result::Result<(), String> {
    if let Some(values) = values {
        if values.is_empty() {
            return Err(format!("\"{}\" must not be empty", field));
        }
        if values.iter().any(|v| v.trim().is_empty()) {
            return Err(format!("\"{}\" contains an empty entry", field));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_devices")]
    pub devices: Vec<String>,
    #[serde(default = "default_viewports")]
    pub viewport: BTreeMap<String, DeviceSpec>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            devices: default_devices(),
            viewport: default_viewports(),
        }
    }
}

fn default_languages() -> Vec<String> {
    vec!["default".to_string(), "en".to_string()]
}

fn default_devices() -> Vec<String> {
    vec!["desktop".to_string(), "mobile".to_string()]
}

fn default_viewports() -> BTreeMap<String, DeviceSpec> {
    let mut table = BTreeMap::new();
    table.insert("desktop".to_string(), DeviceSpec::new(1920, 1080));
    table.insert("mobile".to_string(), DeviceSpec::new(375, 667));
    table
}

/// Contents of the sites file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitesFile {
    pub sites: Vec<SiteConfig>,
    #[serde(default)]
    pub defaults: Defaults,
}

impl SitesFile {
    pub fn new(sites: Vec<SiteConfig>, defaults: Defaults) -> Self {
        Self { sites, defaults }
    }

    /// Reads a JSON (or `.toml`) sites file and validates it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScreenshotError::ConfigError(format!(
                "Sites file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        let file = if is_toml {
            Self::from_toml(&content)?
        } else {
            Self::from_json(&content)?
        };

        tracing::debug!("Loaded {} site(s) from {}", file.sites.len(), path.display());
        Ok(file)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: SitesFile = serde_json::from_str(content).map_err(|e| {
            ScreenshotError::ConfigError(format!("Failed to parse sites JSON: {}", e))
        })?;
        file.validate()?;
        Ok(file)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: SitesFile = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(ScreenshotError::ConfigError(
                "\"sites\" must contain at least one site".into(),
            ));
        }

        if self.defaults.languages.is_empty() || self.defaults.devices.is_empty() {
            return Err(ScreenshotError::ConfigError(
                "\"defaults\" must list at least one language and one device".into(),
            ));
        }

        for (device, spec) in &self.defaults.viewport {
            spec.validate(device)?;
        }

        let mut seen = HashSet::new();
        for (index, site) in self.sites.iter().enumerate() {
            site.validate(index, &self.defaults)?;
            if !seen.insert(site.name.as_str()) {
                return Err(ScreenshotError::ConfigError(format!(
                    "Site #{}: duplicate name \"{}\"",
                    index, site.name
                )));
            }
        }

        Ok(())
    }

    pub fn site(&self, name: &str) -> Result<&SiteConfig> {
        self.sites
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ScreenshotError::ConfigError(format!("Site \"{}\" not found", name)))
    }

    pub fn site_names(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.name.as_str()).collect()
    }
}
