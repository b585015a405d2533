//! Levelforge CLI entry point.

use anyhow::Result;
use clap::Parser;

use levelforge::cli::commands::{generate, preview, sets};
use levelforge::cli::{handle_error, Cli, Commands};
use levelforge::infrastructure::config::ConfigLoader;
use levelforge::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli.command, cli.config.as_deref(), cli.json).await {
        handle_error(err, cli.json);
    }
}

async fn run(command: Commands, config_path: Option<&std::path::Path>, json_mode: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    match command {
        Commands::Generate(args) => generate::execute(args, &config, json_mode).await,
        Commands::Preview(args) => preview::execute(args, json_mode),
        Commands::Sets(args) => sets::execute(args, &config, json_mode).await,
    }
}
