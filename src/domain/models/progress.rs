//! Run lifecycle state machine and progress snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};

/// Lifecycle of a generation run.
///
/// `Idle -> Generating -> {Completed | Cancelled | Error}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Generating,
    Completed,
    Cancelled,
    Error,
}

impl RunStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Error)
    }

    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Generating)
                | (Self::Generating, Self::Completed | Self::Cancelled | Self::Error)
        )
    }

    pub fn transition(self, next: Self) -> DomainResult<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
                reason: "not a valid run lifecycle transition".to_string(),
            })
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-set status inside a multi-set run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetProgress {
    pub set_index: usize,
    pub name: String,
    pub status: RunStatus,
    pub success: usize,
    pub failed: usize,
    pub persisted: bool,
}

/// Point-in-time view of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    pub status: RunStatus,
    pub total: usize,
    pub pending: usize,
    pub generating: usize,
    pub success: usize,
    pub failed: usize,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    #[serde(with = "duration_millis")]
    pub average_task_duration: Duration,
    #[serde(with = "option_duration_millis")]
    pub estimated_remaining: Option<Duration>,
    /// Set currently being generated (0-based) in multi-set runs.
    pub current_set: Option<usize>,
    pub sets: Vec<SetProgress>,
    pub error: Option<String>,
}

impl RunProgress {
    pub fn completed(&self) -> usize {
        self.success + self.failed
    }

    /// Fraction of tasks finished, `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed() as f64 / self.total as f64
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod option_duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
