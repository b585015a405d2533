//! `levelforge sets`: browse stored level sets.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::sqlite::{initialize_database, SqliteLevelSetSink};
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::errors::DomainError;
use crate::domain::models::{Config, LevelSet};
use crate::domain::ports::LevelSetSummary;

#[derive(Args, Debug)]
pub struct SetsArgs {
    #[command(subcommand)]
    pub command: SetsCommands,
}

#[derive(Subcommand, Debug)]
pub enum SetsCommands {
    /// List stored sets, newest first
    List,
    /// Show one stored set with its levels
    Show {
        /// Set ID
        id: String,
    },
}

#[derive(Debug, Serialize)]
pub struct SetListOutput {
    pub sets: Vec<LevelSetSummary>,
    pub total: usize,
}

impl CommandOutput for SetListOutput {
    fn to_human(&self) -> String {
        if self.sets.is_empty() {
            return "No level sets stored.".to_string();
        }
        format!(
            "Found {} set(s):\n{}",
            self.total,
            TableFormatter::new().format_summaries(&self.sets)
        )
    }
}

#[derive(Debug, Serialize)]
pub struct SetDetailOutput {
    pub set: LevelSet,
}

impl CommandOutput for SetDetailOutput {
    fn to_human(&self) -> String {
        let set = &self.set;
        let lines = [
            format!("Set: {}", set.name),
            format!("ID: {}", set.id),
            format!("Created: {}", set.created_at.format("%Y-%m-%d %H:%M:%S")),
            format!("Levels: {} ({} failed)", set.len(), set.failed_count),
            format!(
                "Deviation: {:.3} -> {:.3}",
                set.reorder.deviation_before, set.reorder.deviation_after
            ),
            TableFormatter::new().format_levels(set),
        ];
        lines.join("\n")
    }
}

pub async fn execute(args: SetsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let pool = initialize_database(&config.database)
        .await
        .context("Failed to open level set database")?;
    let sink = SqliteLevelSetSink::new(pool);

    match args.command {
        SetsCommands::List => {
            let sets = sink.list_sets().await?;
            let out = SetListOutput {
                total: sets.len(),
                sets,
            };
            output(&out, json_mode);
        }
        SetsCommands::Show { id } => {
            let uuid = Uuid::parse_str(&id).with_context(|| format!("Invalid set ID: {id}"))?;
            let set = sink
                .get_set(uuid)
                .await?
                .ok_or(DomainError::LevelSetNotFound(id))?;
            output(&SetDetailOutput { set }, json_mode);
        }
    }

    Ok(())
}
