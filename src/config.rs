use crate::chrome::{DeviceSwitchPolicy, LaunchOptions, SessionConfig};
use crate::runner::{CaptureOptions, RetryPolicy, RunOptions};
use crate::task::url::OutputLayout;
use crate::{Result, ScreenshotError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PROJECT_CONFIG_FILE: &str = ".site-screenshooter.toml";

pub const MAX_RETRY_COUNT: u32 = 10;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    pub chrome_path: Option<PathBuf>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Appended to the built-in launch flags.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub device_switch: DeviceSwitchPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(default = "default_sites_file")]
    pub sites_file: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub layout: OutputLayout,
    #[serde(default)]
    pub group_by_device: bool,
    /// Defaults to `results.json` inside the output directory.
    pub results_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_seconds: u64,
    #[serde(default = "default_discovery_wait")]
    pub discovery_wait_ms: u64,
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Elements removed right before each screenshot (floating buttons and the like).
    #[serde(default = "default_hide_selectors")]
    pub hide_selectors: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DiscoveryConfig {
    /// Custom domains that run on the Horoshop platform.
    #[serde(default)]
    pub extra_hosts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_json_pretty")]
    pub json_pretty: bool,
}

fn default_headless() -> bool {
    true
}
fn default_sites_file() -> PathBuf {
    PathBuf::from("sites.json")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}
fn default_retry_count() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    crate::timeouts::ms::RETRY_DELAY
}
fn default_navigation_timeout() -> u64 {
    crate::timeouts::secs::NAVIGATION
}
fn default_discovery_wait() -> u64 {
    crate::timeouts::ms::DISCOVERY_WAIT
}
fn default_settle_delay() -> u64 {
    crate::timeouts::ms::PAGE_SETTLE
}
fn default_hide_selectors() -> Vec<String> {
    vec![".upButton".to_string(), "#upButton".to_string()]
}
fn default_json_pretty() -> bool {
    true
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: default_headless(),
            args: Vec::new(),
            device_switch: DeviceSwitchPolicy::default(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sites_file: default_sites_file(),
            output_dir: default_output_dir(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay(),
            layout: OutputLayout::default(),
            group_by_device: false,
            results_file: None,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_seconds: default_navigation_timeout(),
            discovery_wait_ms: default_discovery_wait(),
            settle_delay_ms: default_settle_delay(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            hide_selectors: default_hide_selectors(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_pretty: default_json_pretty(),
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    default_config_dir().map(|p| p.join("config.toml"))
}

pub fn default_config_dir() -> Result<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .map(|p| p.join("site-screenshooter"))
        .ok_or_else(|| ScreenshotError::ConfigError("Could not determine config directory".into()))
}

/// Lays `overlay` over `base`, table by table; other values are replaced.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn read_toml(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

impl Config {
    /// User config, then the project file in the working directory, then
    /// `SCREENSHOOTER_*` environment variables.
    pub fn load() -> Result<Self> {
        let global_path = default_config_path()?;
        let mut config = Self::load_layers(&[global_path, PathBuf::from(PROJECT_CONFIG_FILE)])?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads one explicit file on top of the defaults, then the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScreenshotError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let mut config = Self::load_layers(&[path.to_path_buf()])?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_layers(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        for path in paths.iter().filter(|p| p.exists()) {
            merge_values(&mut merged, read_toml(path)?);
            tracing::debug!("Loaded config layer {}", path.display());
        }

        Ok(merged.try_into()?)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(headless) = lookup("SCREENSHOOTER_HEADLESS") {
            self.browser.headless = headless == "true" || headless == "1";
        }
        if let Some(path) = lookup("SCREENSHOOTER_CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Some(timeout) = lookup("SCREENSHOOTER_TIMEOUT")
            && let Ok(timeout) = timeout.parse()
        {
            self.performance.navigation_timeout_seconds = timeout;
        }
        if let Some(retry) = lookup("SCREENSHOOTER_RETRY")
            && let Ok(retry) = retry.parse()
        {
            self.run.retry_count = retry;
        }
        if let Some(delay) = lookup("SCREENSHOOTER_DELAY")
            && let Ok(delay) = delay.parse()
        {
            self.run.retry_delay_ms = delay;
        }
        if let Some(dir) = lookup("SCREENSHOOTER_OUTPUT_DIR") {
            self.run.output_dir = PathBuf::from(dir);
        }
    }

    pub fn load_with_overrides(&self, cli_overrides: ConfigOverrides) -> Self {
        let mut config = self.clone();

        if let Some(headless) = cli_overrides.headless {
            config.browser.headless = headless;
        }
        if let Some(chrome_path) = cli_overrides.chrome_path {
            config.browser.chrome_path = Some(chrome_path);
        }
        if let Some(timeout) = cli_overrides.timeout {
            config.performance.navigation_timeout_seconds = timeout;
        }
        if let Some(sites_file) = cli_overrides.sites_file {
            config.run.sites_file = sites_file;
        }
        if let Some(output_dir) = cli_overrides.output_dir {
            config.run.output_dir = output_dir;
        }
        if let Some(retry) = cli_overrides.retry {
            config.run.retry_count = retry;
        }
        if let Some(delay) = cli_overrides.delay {
            config.run.retry_delay_ms = delay;
        }
        if let Some(layout) = cli_overrides.layout {
            config.run.layout = layout;
        }
        if cli_overrides.group_by_device {
            config.run.group_by_device = true;
        }
        if let Some(results_file) = cli_overrides.results_file {
            config.run.results_file = Some(results_file);
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RETRY_COUNT).contains(&self.run.retry_count) {
            return Err(ScreenshotError::ConfigError(format!(
                "retry_count must be between 1 and {}",
                MAX_RETRY_COUNT
            )));
        }

        if self.run.retry_delay_ms > crate::timeouts::ms::MAX_RETRY_DELAY {
            return Err(ScreenshotError::ConfigError(format!(
                "retry_delay_ms must be between 0 and {}",
                crate::timeouts::ms::MAX_RETRY_DELAY
            )));
        }

        if self.performance.navigation_timeout_seconds == 0 {
            return Err(ScreenshotError::ConfigError(
                "navigation_timeout_seconds must be greater than 0".into(),
            ));
        }

        if self.performance.discovery_wait_ms == 0 {
            return Err(ScreenshotError::ConfigError(
                "discovery_wait_ms must be greater than 0".into(),
            ));
        }

        if self.run.output_dir.as_os_str().is_empty() {
            return Err(ScreenshotError::ConfigError(
                "output_dir must not be empty".into(),
            ));
        }

        if let Some(ref path) = self.browser.chrome_path
            && !path.exists()
        {
            return Err(ScreenshotError::ConfigError(format!(
                "Chrome path does not exist: {}",
                path.display()
            )));
        }

        Ok(())
    }

    pub fn results_path(&self) -> PathBuf {
        self.run
            .results_file
            .clone()
            .unwrap_or_else(|| self.run.output_dir.join("results.json"))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            launch: LaunchOptions {
                headless: self.browser.headless,
                chrome_path: self.browser.chrome_path.clone(),
                args: self.browser.args.clone(),
            },
            policy: self.browser.device_switch,
            navigation_timeout: Duration::from_secs(self.performance.navigation_timeout_seconds),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            capture: CaptureOptions {
                output_dir: self.run.output_dir.clone(),
                layout: self.run.layout,
                hide_selectors: self.capture.hide_selectors.clone(),
                discovery_wait: Duration::from_millis(self.performance.discovery_wait_ms),
            },
            retry: RetryPolicy::new(
                self.run.retry_count,
                Duration::from_millis(self.run.retry_delay_ms),
            ),
            group_by_device: self.run.group_by_device,
        }
    }

    pub fn display_text(&self) -> String {
        format!(
            r#"Browser:
  Chrome Path: {}
  Headless: {}
  Extra Args: {}
  Device Switch: {:?}

Run:
  Sites File: {}
  Output Dir: {}
  Layout: {}
  Retry: {} attempt(s), {}ms apart
  Group By Device: {}
  Results File: {}

Performance:
  Navigation Timeout: {}s
  Discovery Wait: {}ms
  Settle Delay: {}ms

Capture:
  Hidden Selectors: {}

Discovery:
  Extra Hosts: {}
"#,
            self.browser
                .chrome_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto-detect".into()),
            self.browser.headless,
            list_or_none(&self.browser.args),
            self.browser.device_switch,
            self.run.sites_file.display(),
            self.run.output_dir.display(),
            self.run.layout,
            self.run.retry_count,
            self.run.retry_delay_ms,
            self.run.group_by_device,
            self.results_path().display(),
            self.performance.navigation_timeout_seconds,
            self.performance.discovery_wait_ms,
            self.performance.settle_delay_ms,
            list_or_none(&self.capture.hide_selectors),
            list_or_none(&self.discovery.extra_hosts),
        )
    }
}

fn list_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".into()
    } else {
        values.join(", ")
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub headless: Option<bool>,
    pub chrome_path: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub sites_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub retry: Option<u32>,
    pub delay: Option<u64>,
    pub layout: Option<OutputLayout>,
    pub group_by_device: bool,
    pub results_file: Option<PathBuf>,
}
