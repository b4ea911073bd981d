pub mod commands;
pub mod dispatch;

use crate::config::{Config, ConfigOverrides};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "site-screenshooter")]
#[command(version, about = "Full-page website screenshots across languages and devices")]
#[command(
    long_about = "Captures home, category and product pages of one or more sites for every configured language and device, with automatic page discovery and retries"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<commands::Command>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Run Chrome in headless mode")]
    pub headless: Option<bool>,

    #[arg(long, global = true, help = "Path to Chrome executable")]
    pub chrome_path: Option<PathBuf>,

    #[arg(long, global = true, help = "Navigation timeout in seconds")]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Config overrides carried by the global flags and the chosen command.
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            headless: self.headless,
            chrome_path: self.chrome_path.clone(),
            timeout: self.timeout,
            ..Default::default()
        };

        match &self.command {
            Some(commands::Command::Run {
                selection,
                output,
                retry,
                delay,
                layout,
                results,
            }) => {
                overrides.sites_file = selection.sites.clone();
                overrides.group_by_device = selection.group_by_device;
                overrides.output_dir = output.clone();
                overrides.retry = *retry;
                overrides.delay = *delay;
                overrides.layout = *layout;
                overrides.results_file = results.clone();
            }
            Some(commands::Command::Tasks { selection }) => {
                overrides.sites_file = selection.sites.clone();
                overrides.group_by_device = selection.group_by_device;
            }
            _ => {}
        }

        overrides
    }
}

pub async fn run() -> crate::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let config = config.load_with_overrides(cli.overrides());
    config.validate()?;

    dispatch::dispatch(cli, config).await
}
