use super::{
    Cli,
    commands::{Command, ConfigCommand},
};
use crate::{
    Result, ScreenshotError,
    config::Config,
    handlers, output,
    runner::TracingObserver,
};
use std::sync::Arc;

pub async fn dispatch(mut cli: Cli, config: Config) -> Result<()> {
    let command = match cli.command.take() {
        Some(cmd) => cmd,
        None => {
            eprintln!("No command provided. Use --help for usage.");
            std::process::exit(1);
        }
    };

    let pretty = config.output.json_pretty;

    match command {
        Command::Run { selection, .. } => {
            let report =
                handlers::run::handle_run(&config, &selection.filter(), Arc::new(TracingObserver))
                    .await?;
            output::print_output(&report, cli.json, pretty)?;

            if !cli.json {
                println!(
                    "{}",
                    output::text::info(&format!(
                        "Results written to {}",
                        config.results_path().display()
                    ))
                );
            }

            if report.summary.failed > 0 {
                return Err(ScreenshotError::TasksFailed {
                    failed: report.summary.failed,
                    total: report.summary.total,
                });
            }
            Ok(())
        }
        Command::Tasks { selection } => {
            let result = handlers::tasks::handle_tasks(&config, &selection.filter())?;
            output::print_output(&result, cli.json, pretty)
        }
        Command::Discover { url, device } => {
            let result = handlers::discover::handle_discover(&config, &url, &device).await?;
            output::print_output(&result, cli.json, pretty)
        }
        Command::Devices => {
            output::print_output(&handlers::devices::handle_devices(), cli.json, pretty)
        }
        Command::Config { subcommand } => handle_config_command(subcommand, &cli, &config),
    }
}

fn handle_config_command(subcommand: ConfigCommand, cli: &Cli, config: &Config) -> Result<()> {
    match subcommand {
        ConfigCommand::Init => {
            let result = handlers::config_handler::handle_config_init()?;
            output::print_output(&result, cli.json, true)
        }
        ConfigCommand::Show => {
            let result = handlers::config_handler::handle_config_show(config);
            output::print_output(&result, cli.json, true)
        }
        ConfigCommand::Path => {
            let result = handlers::config_handler::handle_config_path()?;
            output::print_output(&result, cli.json, true)
        }
    }
}
