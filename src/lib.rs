pub mod chrome;
pub mod cli;
pub mod config;
pub mod devices;
pub mod discovery;
pub mod error;
pub mod handlers;
pub mod js_templates;
pub mod output;
pub mod report;
pub mod runner;
pub mod sites;
pub mod task;
pub mod timeouts;
pub mod utils;

pub use config::Config;
pub use error::ScreenshotError;
pub use report::{AttemptOutcome, ResultLog, RunReport, RunSummary};
pub use runner::ScreenshotRunner;
pub use sites::{SiteConfig, SitesFile};
pub use task::{PageType, ScreenshotTask, Target};

pub type Result<T> = std::result::Result<T, ScreenshotError>;
