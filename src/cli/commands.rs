use crate::task::url::OutputLayout;
use crate::task::{PageType, TaskFilter};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Capture screenshots for every task in the sites file")]
    Run {
        #[command(flatten)]
        selection: TaskSelection,

        #[arg(short, long, help = "Output directory")]
        output: Option<PathBuf>,

        #[arg(long, help = "Attempts per task (1-10)")]
        retry: Option<u32>,

        #[arg(long, help = "Delay between attempts in ms (0-10000)")]
        delay: Option<u64>,

        #[arg(long, help = "Directory layout: site-first (default) or device-first")]
        layout: Option<OutputLayout>,

        #[arg(long, help = "Write the results JSON here instead of <output>/results.json")]
        results: Option<PathBuf>,
    },

    #[command(about = "Print the task list without launching a browser")]
    Tasks {
        #[command(flatten)]
        selection: TaskSelection,
    },

    #[command(about = "Run category/product discovery against a URL")]
    Discover {
        #[arg(help = "Base URL of the site")]
        url: String,

        #[arg(long, default_value = "desktop", help = "Device preset to emulate")]
        device: String,
    },

    #[command(about = "List device presets")]
    Devices,

    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommand,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct TaskSelection {
    #[arg(long, help = "Sites file (JSON or TOML)")]
    pub sites: Option<PathBuf>,

    #[arg(long, value_delimiter = ',', help = "Only these sites (comma separated)")]
    pub site: Vec<String>,

    #[arg(long, value_delimiter = ',', help = "Only these page types: home,category,product")]
    pub pages: Vec<PageType>,

    #[arg(long, value_delimiter = ',', help = "Only these languages (comma separated)")]
    pub languages: Vec<String>,

    #[arg(long, value_delimiter = ',', help = "Only these devices (comma separated)")]
    pub devices: Vec<String>,

    #[arg(long, help = "Run each site's tasks grouped by device")]
    pub group_by_device: bool,
}

impl TaskSelection {
    pub fn filter(&self) -> TaskFilter {
        TaskFilter::new()
            .sites(self.site.iter().cloned())
            .languages(self.languages.iter().cloned())
            .devices(self.devices.iter().cloned())
            .page_types(self.pages.iter().copied())
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    #[command(about = "Initialize config file with defaults")]
    Init,

    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Show config file path")]
    Path,
}
