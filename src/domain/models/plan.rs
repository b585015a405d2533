//! Generation planning: from a dense target curve to per-grade work items.

use serde::{Deserialize, Serialize};

use super::grade::Grade;
use super::task::GenerationTask;
use crate::domain::errors::{DomainError, DomainResult};

/// Count of curve entries per grade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeHistogram {
    counts: [usize; 5],
}

impl GradeHistogram {
    pub fn from_curve(curve: &[f64]) -> Self {
        let mut histogram = Self::default();
        for &difficulty in curve {
            histogram.counts[Grade::classify(difficulty).ordinal()] += 1;
        }
        histogram
    }

    pub fn count(&self, grade: Grade) -> usize {
        self.counts[grade.ordinal()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Non-empty grades in traversal order.
    pub fn iter(&self) -> impl Iterator<Item = (Grade, usize)> + '_ {
        Grade::ALL
            .into_iter()
            .map(|g| (g, self.count(g)))
            .filter(|&(_, c)| c > 0)
    }
}

/// How many artifacts of one planned grade to produce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationPlanItem {
    pub grade: Grade,
    pub target_difficulty: f64,
    pub count: usize,
}

/// Ordered list of plan items covering one curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationPlan {
    items: Vec<GenerationPlanItem>,
}

impl GenerationPlan {
    /// Plan one item per non-empty grade, targeting each grade's midpoint.
    pub fn from_curve(curve: &[f64]) -> Self {
        let histogram = GradeHistogram::from_curve(curve);
        let items = histogram
            .iter()
            .map(|(grade, count)| GenerationPlanItem {
                grade,
                target_difficulty: grade.midpoint(),
                count,
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[GenerationPlanItem] {
        &self.items
    }

    pub fn total_count(&self) -> usize {
        self.items.iter().map(|item| item.count).sum()
    }

    /// Enforce that the plan covers exactly `level_count` levels.
    pub fn validate(&self, level_count: usize) -> DomainResult<()> {
        let planned = self.total_count();
        if planned != level_count {
            return Err(DomainError::PlanMismatch {
                planned,
                expected: level_count,
            });
        }
        Ok(())
    }

    /// Expand into one task per planned artifact, in plan order.
    ///
    /// `global_offset` is the global index of this plan's first task across a
    /// multi-set run.
    pub fn tasks(&self, global_offset: usize) -> Vec<GenerationTask> {
        self.items
            .iter()
            .flat_map(|item| std::iter::repeat(*item).take(item.count))
            .enumerate()
            .map(|(task_index, item)| GenerationTask::new(task_index, global_offset + task_index, item))
            .collect()
    }
}
