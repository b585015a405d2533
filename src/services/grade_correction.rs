//! Grade-correction state machine.
//!
//! After each successful service call the returned grade is compared to the
//! planned one. A mismatch nudges a signed difficulty adjustment toward the
//! planned band and asks for another attempt. Acceptance relaxes over time:
//! exact grade first, any adjacent grade after `adjacent_after` retries, and
//! whatever came back once `max_retries` is spent.

use crate::domain::models::Grade;

/// Requested difficulty never leaves this window.
pub const MIN_TARGET: f64 = 0.05;
pub const MAX_TARGET: f64 = 0.95;

/// Escalating step bands: `(last retry in band, step, cumulative cap)`.
const BANDS: [(u32, f64, f64); 2] = [(10, 0.03, 0.15), (20, 0.05, 0.30)];
const FINAL_STEP: f64 = 0.08;
const FINAL_CAP: f64 = 0.45;

/// Retry state carried between observations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CorrectionState {
    /// Correction retries performed so far.
    pub retry_count: u32,
    pub adjustment: f64,
}

/// How a result was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Exact,
    Adjacent,
    /// Retry budget exhausted; the last grade is kept as-is.
    Compromise,
}

/// Outcome of observing one returned grade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Accept(Acceptance),
    Retry(CorrectionState),
}

/// Bounds for the correction loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeCorrection {
    pub max_retries: u32,
    pub adjacent_after: u32,
}

impl Default for GradeCorrection {
    fn default() -> Self {
        Self {
            max_retries: 30,
            adjacent_after: 20,
        }
    }
}

impl GradeCorrection {
    pub const fn new(max_retries: u32, adjacent_after: u32) -> Self {
        Self {
            max_retries,
            adjacent_after,
        }
    }

    /// Decide what to do with `returned` given the planned grade and the current state.
    pub fn observe(&self, state: CorrectionState, planned: Grade, returned: Grade) -> Decision {
        if returned == planned {
            return Decision::Accept(Acceptance::Exact);
        }
        if state.retry_count >= self.adjacent_after && planned.is_adjacent(returned) {
            return Decision::Accept(Acceptance::Adjacent);
        }
        if state.retry_count >= self.max_retries {
            return Decision::Accept(Acceptance::Compromise);
        }

        let retry = state.retry_count + 1;
        let (step, cap) = step_for_retry(retry);
        // Easier than planned pushes the request harder, and vice versa.
        let direction: f64 = if returned < planned { 1.0 } else { -1.0 };
        let adjustment = direction.mul_add(step, state.adjustment).clamp(-cap, cap);

        Decision::Retry(CorrectionState {
            retry_count: retry,
            adjustment,
        })
    }
}

/// Step size and cumulative cap for the 1-based correction retry number.
pub fn step_for_retry(retry: u32) -> (f64, f64) {
    BANDS
        .iter()
        .find(|(last, _, _)| retry <= *last)
        .map_or((FINAL_STEP, FINAL_CAP), |&(_, step, cap)| (step, cap))
}

/// Planned target shifted by the adjustment, kept inside the request window.
pub fn adjusted_target(planned: f64, adjustment: f64) -> f64 {
    (planned + adjustment).clamp(MIN_TARGET, MAX_TARGET)
}
