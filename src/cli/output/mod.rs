//! CLI output formatting module
//!
//! Human output uses comfy-table and indicatif; `--json` prints the same
//! data as pretty JSON on stdout.

pub mod progress;
pub mod table;

pub use progress::{create_progress_bar, render_run_progress};
pub use table::TableFormatter;

use serde::Serialize;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}
