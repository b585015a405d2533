//! `levelforge generate`: run a curve through the generation service.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::adapters::generation::{HttpGenerationService, ScriptedGenerationService};
use crate::adapters::sqlite::{initialize_database, SqliteLevelSetSink};
use crate::application::RunCoordinator;
use crate::cli::output::{create_progress_bar, output, render_run_progress, CommandOutput, TableFormatter};
use crate::domain::models::{Config, LevelSet};
use crate::domain::ports::GenerationService;
use crate::infrastructure::config::ConfigLoader;
use crate::services::LinearGimmickStrategy;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Run description (YAML)
    #[arg(short, long)]
    pub run: PathBuf,

    /// Override the run name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Use the built-in scripted generator instead of the HTTP service
    #[arg(long)]
    pub offline: bool,

    /// Seed for reproducible jitter
    #[arg(long)]
    pub seed: Option<u64>,

    /// Do not store finished sets in the database
    #[arg(long)]
    pub no_persist: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerateOutput {
    pub cancelled: bool,
    pub total_levels: usize,
    pub sets: Vec<LevelSet>,
}

impl CommandOutput for GenerateOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let mut lines = Vec::new();

        for set in &self.sets {
            lines.push(format!(
                "{} ({} levels, {} failed)",
                console::style(&set.name).bold(),
                set.len(),
                set.failed_count
            ));
            if let Some(id) = &set.storage_id {
                lines.push(format!("Stored as {id}"));
            }
            lines.push(format!(
                "Curve deviation: {:.3} before reorder, {:.3} after (mean {:.3})",
                set.reorder.deviation_before, set.reorder.deviation_after, set.reorder.mean_deviation_after
            ));
            lines.push(formatter.format_levels(set));
        }

        if self.cancelled {
            lines.push(format!(
                "Run cancelled; {} level(s) kept from finished sets.",
                self.total_levels
            ));
        } else {
            lines.push(format!("Generated {} level(s).", self.total_levels));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: GenerateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut run = ConfigLoader::load_run(&args.run)?;
    if let Some(name) = args.name {
        run.name = name;
    }

    let service: Arc<dyn GenerationService> = if args.offline {
        Arc::new(ScriptedGenerationService::new())
    } else {
        Arc::new(HttpGenerationService::new(&config.service).context("Failed to build generation client")?)
    };

    let mut coordinator = RunCoordinator::new(service, config.dispatcher.clone())
        .with_gimmicks(Arc::new(LinearGimmickStrategy::new(config.gimmicks.clone())));
    if let Some(seed) = args.seed {
        coordinator = coordinator.with_seed(seed);
    }
    if !args.no_persist {
        let pool = initialize_database(&config.database)
            .await
            .context("Failed to open level set database")?;
        coordinator = coordinator.with_sink(Arc::new(SqliteLevelSetSink::new(pool)));
    }

    let handle = coordinator.start_run(run);
    let cancel = handle.cancel_token();

    let signal_cancel = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight work");
            signal_cancel.cancel();
        }
    });

    let render = (!json_mode).then(|| {
        tokio::spawn(render_run_progress(
            handle.subscribe_progress(),
            create_progress_bar(0),
        ))
    });

    let result = handle.join().await;
    ctrl_c.abort();
    if let Some(render) = render {
        let _ = render.await;
    }

    let outcome = result.context("Generation run failed")?;
    let out = GenerateOutput {
        cancelled: cancel.is_cancelled(),
        total_levels: outcome.level_count(),
        sets: outcome.into_sets(),
    };
    output(&out, json_mode);
    Ok(())
}
