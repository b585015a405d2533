//! Post-generation reordering of artifacts onto the target curve.
//!
//! Generated artifacts rarely land exactly on their planned difficulty, and
//! tasks are planned per grade rather than per position. Sorting artifacts by
//! actual difficulty and positions by target difficulty, then pairing them
//! rank for rank, minimizes the total absolute deviation.

use std::cmp::Ordering;

use crate::domain::models::{ArtifactResult, Level, ReorderReport};

/// Assigns successful artifacts to curve positions.
pub struct CurveMatcher;

/// Matched levels plus deviation metrics.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub levels: Vec<Level>,
    pub report: ReorderReport,
}

impl CurveMatcher {
    /// Match successful results onto `target_curve`.
    ///
    /// Failed results are ignored. The curve is truncated to the number of
    /// successes; levels come back in curve-position order and are renamed
    /// `Level N`.
    pub fn match_to_curve(results: &[ArtifactResult], target_curve: &[f64]) -> MatchOutcome {
        let mut successes: Vec<&ArtifactResult> =
            results.iter().filter(|r| r.is_success()).collect();
        successes.sort_by_key(|r| r.task_index);
        successes.truncate(target_curve.len());

        let targets = &target_curve[..successes.len()];
        let actuals: Vec<f64> = successes.iter().map(|r| r.actual_difficulty).collect();
        let assignment = rank_assignment(&actuals, targets);

        let levels: Vec<Level> = assignment
            .iter()
            .enumerate()
            .filter_map(|(position, &artifact_idx)| {
                let result = successes[artifact_idx];
                let artifact = result.artifact.clone()?;
                let grade = result.grade?;
                Some(Level {
                    position,
                    name: format!("Level {}", position + 1),
                    artifact,
                    actual_difficulty: result.actual_difficulty,
                    grade,
                    target_difficulty: targets[position],
                    source_task_index: result.task_index,
                })
            })
            .collect();

        let deviation_before = total_deviation(&actuals, targets);
        let assigned: Vec<f64> = assignment.iter().map(|&i| actuals[i]).collect();
        let deviation_after = total_deviation(&assigned, targets);
        let mean_deviation_after = if assigned.is_empty() {
            0.0
        } else {
            deviation_after / assigned.len() as f64
        };

        MatchOutcome {
            levels,
            report: ReorderReport {
                deviation_before,
                deviation_after,
                mean_deviation_after,
                improvement: (deviation_before - deviation_after).max(0.0),
            },
        }
    }
}

/// For each target position, the index of the value assigned to it.
///
/// Both sequences must have equal length. Sorting is stable, so ties keep
/// their original order.
pub fn rank_assignment(values: &[f64], targets: &[f64]) -> Vec<usize> {
    debug_assert_eq!(values.len(), targets.len());

    let mut value_order: Vec<usize> = (0..values.len()).collect();
    value_order.sort_by(|&a, &b| cmp_f64(values[a], values[b]));

    let mut target_order: Vec<usize> = (0..targets.len()).collect();
    target_order.sort_by(|&a, &b| cmp_f64(targets[a], targets[b]));

    let mut assignment = vec![0; targets.len()];
    for (rank, &position) in target_order.iter().enumerate() {
        assignment[position] = value_order[rank];
    }
    assignment
}

/// Sum of `|value - target|` pairing element-wise.
pub fn total_deviation(values: &[f64], targets: &[f64]) -> f64 {
    values
        .iter()
        .zip(targets)
        .map(|(v, t)| (v - t).abs())
        .sum()
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Grade, TaskStatus};

    fn result(task_index: usize, actual: f64) -> ArtifactResult {
        ArtifactResult {
            task_index,
            artifact: Some(serde_json::json!({ "task": task_index })),
            actual_difficulty: actual,
            grade: Some(Grade::classify(actual)),
            planned_grade: Grade::classify(actual),
            planned_difficulty: actual,
            status: TaskStatus::Success,
            grade_retries: 0,
            service_retries: 0,
            compromise: false,
            error: None,
        }
    }

    #[test]
    fn test_sorted_input_is_noop() {
        let results = vec![result(0, 0.1), result(1, 0.4), result(2, 0.8)];
        let outcome = CurveMatcher::match_to_curve(&results, &[0.1, 0.4, 0.8]);
        let order: Vec<usize> = outcome.levels.iter().map(|l| l.source_task_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert!(outcome.report.deviation_after.abs() < 1e-9);
        assert!(outcome.report.improvement.abs() < 1e-9);
    }

    #[test]
    fn test_reorders_to_track_curve() {
        // Generated hardest first; curve ramps up.
        let results = vec![result(0, 0.9), result(1, 0.5), result(2, 0.1)];
        let outcome = CurveMatcher::match_to_curve(&results, &[0.1, 0.5, 0.9]);
        let order: Vec<usize> = outcome.levels.iter().map(|l| l.source_task_index).collect();
        assert_eq!(order, vec![2, 1, 0]);
        assert_eq!(outcome.levels[0].name, "Level 1");
        assert_eq!(outcome.levels[2].position, 2);
        assert!((outcome.report.deviation_before - 1.6).abs() < 1e-9);
        assert!(outcome.report.deviation_after.abs() < 1e-9);
    }

    #[test]
    fn test_failed_results_are_dropped_and_curve_truncated() {
        let mut failed = result(1, 0.0);
        failed.status = TaskStatus::Failed;
        failed.artifact = None;
        let results = vec![result(0, 0.7), failed, result(2, 0.2)];
        let outcome = CurveMatcher::match_to_curve(&results, &[0.1, 0.3, 0.9]);
        assert_eq!(outcome.levels.len(), 2);
        // Truncated curve is [0.1, 0.3]
        assert_eq!(outcome.levels[0].source_task_index, 2);
        assert!((outcome.levels[1].target_difficulty - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_non_monotonic_curve() {
        let assignment = rank_assignment(&[0.2, 0.6, 0.4], &[0.5, 0.1, 0.7]);
        // Position 1 (lowest target) gets value 0 (0.2), position 0 gets value 2 (0.4)
        assert_eq!(assignment, vec![2, 0, 1]);
    }

    #[test]
    fn test_empty() {
        let outcome = CurveMatcher::match_to_curve(&[], &[0.5]);
        assert!(outcome.levels.is_empty());
        assert!(outcome.report.mean_deviation_after.abs() < f64::EPSILON);
    }
}
