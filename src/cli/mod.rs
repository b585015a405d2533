//! Command-line interface for levelforge.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::generate::GenerateArgs;
use commands::preview::PreviewArgs;
use commands::sets::SetsArgs;

#[derive(Parser)]
#[command(name = "levelforge")]
#[command(about = "Generate level sets that follow a difficulty curve", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .levelforge/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate one or more level sets from a run file
    Generate(GenerateArgs),

    /// Show the dense curve and generation plan without generating
    Preview(PreviewArgs),

    /// Inspect stored level sets
    Sets(SetsArgs),
}

/// Print `err` in the selected format and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {:#}", console::style("error:").red().bold(), err);
    }
    std::process::exit(1);
}
