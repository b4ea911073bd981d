use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreenshotError {
    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Could not find Chrome/Chromium executable. Please specify with --chrome-path")]
    ChromeNotFound,

    #[error("Navigation timeout after {0}s")]
    NavigationTimeout(u64),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationError(String),

    #[error("No {page_type} page discovered for {site}")]
    DiscoveryUnresolved { site: String, page_type: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Device profile not found: {0}")]
    DeviceNotFound(String),

    #[error("Browser is not launched")]
    BrowserNotLaunched,

    #[error("No active page")]
    NoActivePage,

    #[error("Run aborted by signal")]
    Aborted,

    #[error("{failed} of {total} task(s) failed")]
    TasksFailed { failed: usize, total: usize },

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("General error: {0}")]
    General(String),
}

impl ScreenshotError {
    /// Errors that must surface to the top-level boundary instead of being retried.
    ///
    /// Configuration problems, a missing browser binary and page/browser
    /// lifecycle violations are programming or setup mistakes; retrying them
    /// only hides the cause.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ChromeNotFound
                | Self::ConfigError(_)
                | Self::InvalidUrl(_)
                | Self::DeviceNotFound(_)
                | Self::TomlDeError(_)
                | Self::TomlSerError(_)
                | Self::BrowserNotLaunched
                | Self::NoActivePage
                | Self::Aborted
        )
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ChromeNotFound => vec![
                "Install Chrome or Chromium".into(),
                "Point to the binary with --chrome-path or SCREENSHOOTER_CHROME_PATH".into(),
            ],
            Self::LaunchFailed(_) => vec![
                "Ensure Chrome/Chromium is installed".into(),
                "Try specifying Chrome path with --chrome-path".into(),
                "Run with --headless true inside containers".into(),
            ],
            Self::NavigationTimeout(timeout) => vec![
                format!("Increase timeout with --timeout {}", timeout + 30),
                "Check network connectivity".into(),
                "Verify the site is reachable".into(),
            ],
            Self::Navigation { .. } => vec![
                "Check that the base URL and page paths are correct".into(),
                "Increase the retry count with --retry".into(),
            ],
            Self::ScreenshotFailed(_) => vec![
                "Ensure output directory exists and is writable".into(),
                "Check if page is fully loaded".into(),
            ],
            Self::DiscoveryUnresolved { page_type, .. } => vec![
                format!("Configure an explicit \"{}\" path for the site", page_type),
                "Run 'site-screenshooter discover <url>' to inspect discovery".into(),
            ],
            Self::ConfigError(_) | Self::TomlDeError(_) | Self::JsonError(_) => vec![
                "Check configuration file syntax".into(),
                "Run with --verbose to see detailed error".into(),
                "Use --config or --sites to specify a different file".into(),
            ],
            Self::InvalidUrl(_) => vec![
                "Ensure URL includes protocol (http:// or https://)".into(),
                "Check for typos in the URL".into(),
            ],
            Self::DeviceNotFound(name) => vec![
                "List available devices with: site-screenshooter devices".into(),
                format!("Add a viewport entry for '{}' to the sites file", name),
            ],
            Self::TasksFailed { .. } => vec![
                "See the results file for the error of each failed task".into(),
                "Increase the retry count with --retry".into(),
            ],
            Self::BrowserNotLaunched | Self::NoActivePage => vec![
                "This is an internal sequencing error; please report it".into(),
            ],
            _ => vec![
                "Run with --verbose for more details".into(),
                "Check the documentation for help".into(),
            ],
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::LaunchFailed(_)
            | Self::ChromeNotFound
            | Self::BrowserNotLaunched
            | Self::NoActivePage => 3,
            Self::NavigationTimeout(_) | Self::Navigation { .. } => 4,
            Self::IoError(_) | Self::ScreenshotFailed(_) => 6,
            Self::ConfigError(_)
            | Self::TomlDeError(_)
            | Self::TomlSerError(_)
            | Self::JsonError(_)
            | Self::DeviceNotFound(_) => 7,
            Self::InvalidUrl(_) => 2,
            Self::TasksFailed { .. } => 5,
            Self::Aborted => 130,
            _ => 1,
        }
    }
}
