//! Difficulty curve domain model.
//!
//! A curve is authored as a sparse set of control points and expanded into a
//! dense per-level target sequence by linear interpolation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::errors::{DomainError, DomainResult};

/// Difficulty used when a curve has no control points.
pub const DEFAULT_DIFFICULTY: f64 = 0.5;

/// A single user-authored control point: "at level `index`, difficulty `difficulty`".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyPoint {
    /// 1-based level index.
    pub index: u32,
    /// Target difficulty in `[0, 1]`.
    pub difficulty: f64,
}

impl DifficultyPoint {
    pub fn new(index: u32, difficulty: f64) -> DomainResult<Self> {
        let point = Self { index, difficulty };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.index == 0 {
            return Err(DomainError::ValidationFailed(
                "control point index must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.difficulty) {
            return Err(DomainError::ValidationFailed(format!(
                "control point difficulty {} at index {} is outside [0, 1]",
                self.difficulty, self.index
            )));
        }
        Ok(())
    }
}

/// Sparse difficulty curve, deduplicated by index (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<DifficultyPoint>", into = "Vec<DifficultyPoint>")]
pub struct DifficultyCurve {
    points: BTreeMap<u32, f64>,
}

impl DifficultyCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a curve from points; later points override earlier ones at the same index.
    pub fn from_points(points: impl IntoIterator<Item = DifficultyPoint>) -> Self {
        let mut curve = Self::new();
        for point in points {
            curve.upsert(point);
        }
        curve
    }

    /// Insert or replace the point at `point.index`.
    pub fn upsert(&mut self, point: DifficultyPoint) {
        self.points.insert(point.index, point.difficulty);
    }

    /// Remove the point at `index`, returning its difficulty if present.
    pub fn remove(&mut self, index: u32) -> Option<f64> {
        self.points.remove(&index)
    }

    /// Points sorted by index.
    pub fn points(&self) -> Vec<DifficultyPoint> {
        self.points
            .iter()
            .map(|(&index, &difficulty)| DifficultyPoint { index, difficulty })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn validate(&self) -> DomainResult<()> {
        self.points().iter().try_for_each(DifficultyPoint::validate)
    }

    /// Interpolated difficulty at a 1-based level index, clamped to `[0, 1]`.
    ///
    /// Indices before the first or after the last point take that endpoint's value.
    pub fn interpolate(&self, index: u32) -> f64 {
        let Some((&first_idx, &first_d)) = self.points.iter().next() else {
            return DEFAULT_DIFFICULTY;
        };
        if index <= first_idx {
            return first_d.clamp(0.0, 1.0);
        }

        // BTreeMap ranges give the bracketing points directly.
        let lower = self.points.range(..=index).next_back();
        let upper = self.points.range(index..).next();

        let value = match (lower, upper) {
            (Some((&i1, &d1)), Some((&i2, &d2))) => {
                if i1 == i2 {
                    d1
                } else {
                    let t = f64::from(index - i1) / f64::from(i2 - i1);
                    d1 + (d2 - d1) * t
                }
            }
            (Some((_, &d)), None) | (None, Some((_, &d))) => d,
            (None, None) => first_d,
        };
        value.clamp(0.0, 1.0)
    }

    /// Dense target curve with exactly `level_count` entries (levels `1..=level_count`).
    pub fn dense(&self, level_count: usize) -> Vec<f64> {
        (1..=level_count)
            .map(|i| self.interpolate(u32::try_from(i).unwrap_or(u32::MAX)))
            .collect()
    }

    /// Copy of this curve with every point shifted by `delta`, clamped to `[0, max]`.
    pub fn shifted(&self, delta: f64, max: f64) -> Self {
        let ceiling = max.clamp(0.0, 1.0);
        Self {
            points: self
                .points
                .iter()
                .map(|(&i, &d)| (i, (d + delta).clamp(0.0, ceiling)))
                .collect(),
        }
    }
}

impl From<Vec<DifficultyPoint>> for DifficultyCurve {
    fn from(points: Vec<DifficultyPoint>) -> Self {
        Self::from_points(points)
    }
}

impl From<DifficultyCurve> for Vec<DifficultyPoint> {
    fn from(curve: DifficultyCurve) -> Self {
        curve.points()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(index: u32, difficulty: f64) -> DifficultyPoint {
        DifficultyPoint { index, difficulty }
    }

    #[test]
    fn test_empty_curve_defaults_to_midpoint() {
        let curve = DifficultyCurve::new();
        assert_eq!(curve.dense(3), vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_linear_span() {
        let curve = DifficultyCurve::from_points([pt(1, 0.1), pt(10, 0.9)]);
        let dense = curve.dense(10);
        assert_eq!(dense.len(), 10);
        assert!((dense[0] - 0.1).abs() < 1e-9);
        assert!((dense[9] - 0.9).abs() < 1e-9);
        for pair in dense.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        // (5 - 1) / 9 of the way from 0.1 to 0.9
        assert!((dense[4] - (0.1 + 0.8 * 4.0 / 9.0)).abs() < 1e-9);
    }

    #[test]
    fn test_clamps_outside_control_range() {
        let curve = DifficultyCurve::from_points([pt(3, 0.3), pt(5, 0.7)]);
        assert!((curve.interpolate(1) - 0.3).abs() < 1e-9);
        assert!((curve.interpolate(9) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_upsert_last_write_wins() {
        let mut curve = DifficultyCurve::from_points([pt(2, 0.2), pt(2, 0.8)]);
        assert_eq!(curve.len(), 1);
        assert!((curve.interpolate(2) - 0.8).abs() < 1e-9);
        curve.upsert(pt(2, 0.4));
        assert!((curve.interpolate(2) - 0.4).abs() < 1e-9);
        assert_eq!(curve.remove(2), Some(0.4));
        assert!(curve.is_empty());
    }

    #[test]
    fn test_points_sorted_regardless_of_insertion_order() {
        let curve = DifficultyCurve::from_points([pt(9, 0.9), pt(1, 0.1), pt(4, 0.5)]);
        let indexes: Vec<u32> = curve.points().iter().map(|p| p.index).collect();
        assert_eq!(indexes, vec![1, 4, 9]);
    }

    #[test]
    fn test_shift_clamps_to_ceiling() {
        let curve = DifficultyCurve::from_points([pt(1, 0.2), pt(10, 0.85)]);
        let shifted = curve.shifted(0.1, 0.9);
        let points = shifted.points();
        assert!((points[0].difficulty - 0.3).abs() < 1e-9);
        assert!((points[1].difficulty - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_point_validation() {
        assert!(DifficultyPoint::new(0, 0.5).is_err());
        assert!(DifficultyPoint::new(1, 1.5).is_err());
        assert!(DifficultyPoint::new(1, 1.0).is_ok());
    }

    #[test]
    fn test_yaml_round_trip_as_point_list() {
        let yaml = "- index: 1\n  difficulty: 0.1\n- index: 5\n  difficulty: 0.6\n";
        let curve: DifficultyCurve = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(curve.len(), 2);
        assert!((curve.interpolate(3) - 0.35).abs() < 1e-9);
    }
}
