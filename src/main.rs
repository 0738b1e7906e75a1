//! zipindustry - Top industries for the county behind a U.S. ZIP code
//!
//! # Usage
//!
//! ```bash
//! export HUD_API_TOKEN=...
//! zipindustry top 22031 --metric employees
//! zipindustry drill 22031 54 --json
//! ```

use clap::Parser;

use zipindustry::cli::{Cli, Command, ExitCode, Output};
use zipindustry::commands;
use zipindustry::config::Config;
use zipindustry::logging;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level());

    run_cli(cli).await.into()
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);

    let config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => return output.error(format!("{:#}", e), ExitCode::InvalidArgs),
        },
        None => Config::load(),
    };

    match cli.command {
        Command::County(cmd) => commands::county_cmd(cmd, &config, &output).await,
        Command::Top(cmd) => commands::top_cmd(cmd, &config, &output).await,
        Command::Drill(cmd) => commands::drill_cmd(cmd, &config, &output).await,
        Command::Tree(cmd) => commands::tree_cmd(cmd, &config, &output).await,
        Command::Children(cmd) => commands::children_cmd(cmd, &config, &output).await,
    }
}
