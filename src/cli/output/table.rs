//! Table output formatting for CLI commands
//!
//! Level sets, generation plans and stored-set listings rendered with
//! comfy-table. Colors follow `NO_COLOR` and dumb terminals.

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{GenerationPlan, Grade, GradeHistogram, LevelSet};
use crate::domain::ports::LevelSetSummary;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Levels of a set in curve order.
    pub fn format_levels(&self, set: &LevelSet) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["#", "Name", "Target", "Actual", "Δ", "Grade", "Task"]));

        for level in &set.levels {
            table.add_row(vec![
                Cell::new(level.position + 1).set_alignment(CellAlignment::Right),
                Cell::new(&level.name),
                number(level.target_difficulty),
                number(level.actual_difficulty),
                number((level.actual_difficulty - level.target_difficulty).abs()),
                self.grade_cell(level.grade),
                Cell::new(level.source_task_index).set_alignment(CellAlignment::Right),
            ]);
        }

        table.to_string()
    }

    /// Dense target curve with the grade each level falls into.
    pub fn format_curve(&self, curve: &[f64]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Level", "Target", "Grade"]));

        for (i, &difficulty) in curve.iter().enumerate() {
            table.add_row(vec![
                Cell::new(i + 1).set_alignment(CellAlignment::Right),
                number(difficulty),
                self.grade_cell(Grade::classify(difficulty)),
            ]);
        }

        table.to_string()
    }

    /// Generation plan with per-grade counts.
    pub fn format_plan(&self, plan: &GenerationPlan, histogram: &GradeHistogram) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Grade", "Target", "Count", "Share"]));

        let total = histogram.total().max(1);
        for item in plan.items() {
            table.add_row(vec![
                self.grade_cell(item.grade),
                number(item.target_difficulty),
                Cell::new(item.count).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.0}%", item.count as f64 * 100.0 / total as f64))
                    .set_alignment(CellAlignment::Right),
            ]);
        }

        table.to_string()
    }

    /// Stored level sets.
    pub fn format_summaries(&self, sets: &[LevelSetSummary]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Name", "Levels", "Mean Δ", "Created"]));

        for set in sets {
            table.add_row(vec![
                Cell::new(set.id.get(..8).unwrap_or(&set.id)),
                Cell::new(&set.name),
                Cell::new(set.level_count).set_alignment(CellAlignment::Right),
                number(set.mean_deviation),
                Cell::new(set.created_at.format("%Y-%m-%d %H:%M").to_string()),
            ]);
        }

        table.to_string()
    }

    fn grade_cell(&self, grade: Grade) -> Cell {
        let cell = Cell::new(grade.as_str()).set_alignment(CellAlignment::Center);
        if self.use_colors {
            cell.fg(grade_color(grade))
        } else {
            cell
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

fn number(value: f64) -> Cell {
    Cell::new(format!("{value:.3}")).set_alignment(CellAlignment::Right)
}

fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }
    console::colors_enabled()
}

const fn grade_color(grade: Grade) -> Color {
    match grade {
        Grade::S => Color::Green,
        Grade::A => Color::Cyan,
        Grade::B => Color::Yellow,
        Grade::C => Color::Magenta,
        Grade::D => Color::Red,
    }
}
