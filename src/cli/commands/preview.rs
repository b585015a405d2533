//! `levelforge preview`: dense curve and plan for a run file, no generation.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{GenerationPlan, GradeHistogram};
use crate::infrastructure::config::ConfigLoader;
use crate::services::multi_set::set_requests;
use crate::services::pipeline::plan_set;

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Run description (YAML)
    #[arg(short, long)]
    pub run: PathBuf,

    /// Also list every level's target difficulty
    #[arg(long)]
    pub levels: bool,
}

#[derive(Debug, Serialize)]
pub struct SetPreview {
    pub name: String,
    pub curve: Vec<f64>,
    pub histogram: GradeHistogram,
    pub plan: GenerationPlan,
}

#[derive(Debug, Serialize)]
pub struct PreviewOutput {
    pub sets: Vec<SetPreview>,
    #[serde(skip)]
    pub show_levels: bool,
}

impl CommandOutput for PreviewOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let mut lines = Vec::new();
        for set in &self.sets {
            lines.push(format!("{} ({} levels)", console::style(&set.name).bold(), set.curve.len()));
            if self.show_levels {
                lines.push(formatter.format_curve(&set.curve));
            }
            lines.push(formatter.format_plan(&set.plan, &set.histogram));
        }
        lines.join("\n")
    }
}

pub fn execute(args: PreviewArgs, json_mode: bool) -> Result<()> {
    let run = ConfigLoader::load_run(&args.run)?;

    let sets = set_requests(&run)
        .into_iter()
        .map(|request| {
            let (curve, plan) = plan_set(&request.curve, request.level_count)?;
            Ok(SetPreview {
                name: request.name,
                histogram: GradeHistogram::from_curve(&curve),
                curve,
                plan,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let out = PreviewOutput {
        sets,
        show_levels: args.levels,
    };
    output(&out, json_mode);
    Ok(())
}
