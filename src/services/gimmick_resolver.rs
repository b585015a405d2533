//! Gimmick intensity ramp and unlock filtering.
//!
//! Later levels get stronger gimmicks and a larger pool of them. The
//! dispatcher only depends on [`GimmickStrategy`], so other progressions can
//! be swapped in.

use crate::domain::models::GimmickUnlock;

/// Linear intensity ramp from 0 at the first index to 1 at the last.
///
/// Single-item sequences return 1.
pub fn gimmick_intensity(global_index: usize, total_count: usize) -> f64 {
    if total_count <= 1 {
        return 1.0;
    }
    let last = (total_count - 1) as f64;
    (global_index as f64 / last).clamp(0.0, 1.0)
}

/// Names of gimmicks whose unlock level is at or below `level_number`, in table order.
pub fn unlocked_gimmicks(table: &[GimmickUnlock], level_number: usize) -> Vec<String> {
    table
        .iter()
        .filter(|g| g.unlock_level <= level_number)
        .map(|g| g.name.clone())
        .collect()
}

/// Strategy for parameterizing gimmicks per level.
pub trait GimmickStrategy: Send + Sync {
    /// Intensity in `[0, 1]` for a level at `global_index` of `total_count`.
    fn intensity(&self, global_index: usize, total_count: usize) -> f64;

    /// Gimmicks available at a 1-based level number.
    fn available(&self, level_number: usize) -> Vec<String>;
}

/// Default strategy: linear ramp plus a static unlock table.
#[derive(Debug, Clone, Default)]
pub struct LinearGimmickStrategy {
    table: Vec<GimmickUnlock>,
}

impl LinearGimmickStrategy {
    pub fn new(table: Vec<GimmickUnlock>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &[GimmickUnlock] {
        &self.table
    }
}

impl GimmickStrategy for LinearGimmickStrategy {
    fn intensity(&self, global_index: usize, total_count: usize) -> f64 {
        gimmick_intensity(global_index, total_count)
    }

    fn available(&self, level_number: usize) -> Vec<String> {
        unlocked_gimmicks(&self.table, level_number)
    }
}
