//! Description of a single generation run as authored by the caller.

use serde::{Deserialize, Serialize};

use super::curve::DifficultyCurve;
use crate::domain::errors::{DomainError, DomainResult};

/// Repeats a run over progressively shifted curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MultiSetConfig {
    pub set_count: usize,
    /// Added to every control point per set index.
    pub difficulty_shift_per_set: f64,
    /// Ceiling applied after shifting.
    #[serde(default = "default_max_difficulty_clamp")]
    pub max_difficulty_clamp: f64,
}

const fn default_max_difficulty_clamp() -> f64 {
    1.0
}

impl Default for MultiSetConfig {
    fn default() -> Self {
        Self {
            set_count: 1,
            difficulty_shift_per_set: 0.0,
            max_difficulty_clamp: default_max_difficulty_clamp(),
        }
    }
}

/// What to generate: name, size, curve and opaque shape parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunConfig {
    pub name: String,
    pub level_count: usize,
    #[serde(default)]
    pub points: DifficultyCurve,
    /// Present for multi-set runs.
    #[serde(default)]
    pub multi_set: Option<MultiSetConfig>,
    /// Passed through untouched to the generation service.
    #[serde(default)]
    pub shape_params: serde_json::Value,
}

impl RunConfig {
    pub fn new(name: impl Into<String>, level_count: usize, points: DifficultyCurve) -> Self {
        Self {
            name: name.into(),
            level_count,
            points,
            multi_set: None,
            shape_params: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_multi_set(mut self, multi_set: MultiSetConfig) -> Self {
        self.multi_set = Some(multi_set);
        self
    }

    #[must_use]
    pub fn with_shape_params(mut self, params: serde_json::Value) -> Self {
        self.shape_params = params;
        self
    }

    pub fn set_count(&self) -> usize {
        self.multi_set.map_or(1, |m| m.set_count)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationFailed("run name cannot be empty".to_string()));
        }
        if self.level_count == 0 {
            return Err(DomainError::ValidationFailed(
                "level_count must be at least 1".to_string(),
            ));
        }
        self.points.validate()?;
        if let Some(multi) = &self.multi_set {
            if multi.set_count == 0 {
                return Err(DomainError::ValidationFailed(
                    "multi_set.set_count must be at least 1".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&multi.max_difficulty_clamp) {
                return Err(DomainError::ValidationFailed(format!(
                    "multi_set.max_difficulty_clamp {} is outside [0, 1]",
                    multi.max_difficulty_clamp
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_yaml() {
        let yaml = r"
name: Spring Pack
level_count: 20
points:
  - index: 1
    difficulty: 0.1
  - index: 20
    difficulty: 0.8
multi_set:
  set_count: 3
  difficulty_shift_per_set: 0.05
shape_params:
  width: 8
  height: 8
";
        let run: RunConfig = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(run.level_count, 20);
        assert_eq!(run.points.len(), 2);
        assert_eq!(run.set_count(), 3);
        assert!((run.multi_set.unwrap().max_difficulty_clamp - 1.0).abs() < f64::EPSILON);
        assert_eq!(run.shape_params["width"], 8);
        assert!(run.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_runs() {
        let curve = DifficultyCurve::new();
        assert!(RunConfig::new("", 5, curve.clone()).validate().is_err());
        assert!(RunConfig::new("x", 0, curve.clone()).validate().is_err());
        let zero_sets = RunConfig::new("x", 5, curve).with_multi_set(MultiSetConfig {
            set_count: 0,
            ..Default::default()
        });
        assert!(zero_sets.validate().is_err());
    }
}
