//! Discrete difficulty grades.
//!
//! A grade is a fixed band of the continuous `[0, 1]` difficulty scale.
//! Bands are closed on their upper bound: `0.20` is still `S`, `0.2001`
//! is already `A`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered difficulty band, easiest (`S`) to hardest (`D`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

/// Upper bounds (inclusive) of each grade band, in grade order.
const UPPER_BOUNDS: [f64; 5] = [0.20, 0.40, 0.60, 0.80, 1.0];

impl Grade {
    /// All grades in planning traversal order.
    pub const ALL: [Self; 5] = [Self::S, Self::A, Self::B, Self::C, Self::D];

    /// Map a continuous difficulty onto its grade.
    ///
    /// Values outside `[0, 1]` fall into the nearest end band.
    pub fn classify(difficulty: f64) -> Self {
        if difficulty <= 0.20 {
            Self::S
        } else if difficulty <= 0.40 {
            Self::A
        } else if difficulty <= 0.60 {
            Self::B
        } else if difficulty <= 0.80 {
            Self::C
        } else {
            Self::D
        }
    }

    /// Position in the `S < A < B < C < D` order.
    pub const fn ordinal(self) -> usize {
        match self {
            Self::S => 0,
            Self::A => 1,
            Self::B => 2,
            Self::C => 3,
            Self::D => 4,
        }
    }

    /// Lower (exclusive) and upper (inclusive) bound of the band.
    pub fn range(self) -> (f64, f64) {
        let idx = self.ordinal();
        let lower = if idx == 0 { 0.0 } else { UPPER_BOUNDS[idx - 1] };
        (lower, UPPER_BOUNDS[idx])
    }

    /// Midpoint of the band, used as the planned target for the grade.
    pub fn midpoint(self) -> f64 {
        let (lower, upper) = self.range();
        (lower + upper) / 2.0
    }

    /// Signed distance in grade steps (`other - self`).
    pub fn steps_to(self, other: Self) -> i32 {
        other.ordinal() as i32 - self.ordinal() as i32
    }

    /// True when `other` is exactly one step away.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.steps_to(other).abs() == 1
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Ok(Self::S),
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            other => Err(format!("unknown grade: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(Grade::classify(0.0), Grade::S);
        assert_eq!(Grade::classify(0.20), Grade::S);
        assert_eq!(Grade::classify(0.2001), Grade::A);
        assert_eq!(Grade::classify(0.40), Grade::A);
        assert_eq!(Grade::classify(0.60), Grade::B);
        assert_eq!(Grade::classify(0.80), Grade::C);
        assert_eq!(Grade::classify(0.8001), Grade::D);
        assert_eq!(Grade::classify(1.0), Grade::D);
    }

    #[test]
    fn test_midpoints_classify_into_own_band() {
        for grade in Grade::ALL {
            assert_eq!(Grade::classify(grade.midpoint()), grade);
        }
        assert!((Grade::S.midpoint() - 0.10).abs() < 1e-9);
        assert!((Grade::D.midpoint() - 0.90).abs() < 1e-9);
    }

    #[test]
    fn test_ordering_and_adjacency() {
        assert!(Grade::S < Grade::A && Grade::C < Grade::D);
        assert!(Grade::B.is_adjacent(Grade::A));
        assert!(Grade::B.is_adjacent(Grade::C));
        assert!(!Grade::B.is_adjacent(Grade::B));
        assert!(!Grade::S.is_adjacent(Grade::B));
        assert_eq!(Grade::S.steps_to(Grade::D), 4);
        assert_eq!(Grade::C.steps_to(Grade::A), -2);
    }

    #[test]
    fn test_parse_round_trip() {
        assert_eq!("b".parse::<Grade>().unwrap(), Grade::B);
        assert!("E".parse::<Grade>().is_err());
    }
}
