//! Time and duration indexing shared by all calculators
//!
//! Calendar time and sojourn duration are discretised with the same step size `h`.
//! The duration dimension is ragged: at time index `t` the largest reachable
//! duration index is `initial_duration / h + t`.

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};
use crate::policy::Policy;

/// Tolerance when checking that a time span is a whole number of steps
const ALIGNMENT_TOLERANCE: f64 = 1e-9;

/// Uniform time/duration grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationTimeGrid {
    step_size: f64,
}

impl DurationTimeGrid {
    pub fn new(step_size: f64) -> Result<Self> {
        if !(step_size > 0.0 && step_size.is_finite()) {
            return Err(ProjectionError::InvalidConfig(format!(
                "step size must be positive, got {}",
                step_size
            )));
        }
        Ok(Self { step_size })
    }

    /// Monthly grid (h = 1/12)
    pub fn monthly() -> Self {
        Self {
            step_size: 1.0 / 12.0,
        }
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Number of grid points from `start_time` up to the policy's expiry age
    ///
    /// Fails when the span is not a whole number of steps; a negative span yields zero points.
    pub fn number_of_time_points(&self, policy: &Policy, start_time: f64) -> Result<usize> {
        let raw = (policy.expiry_age - start_time) / self.step_size + 1.0;
        let rounded = raw.round();

        if (raw - rounded).abs() > ALIGNMENT_TOLERANCE {
            return Err(ProjectionError::Alignment {
                policy_id: policy.policy_id.clone(),
                expiry_age: policy.expiry_age,
                start_time,
                step_size: self.step_size,
            });
        }

        if rounded <= 0.0 {
            return Ok(0);
        }
        Ok(rounded as usize)
    }

    /// Largest duration index reachable at `time_index`
    pub fn duration_support_index(&self, initial_duration: f64, time_index: usize) -> usize {
        let initial_index = (initial_duration / self.step_size + ALIGNMENT_TOLERANCE).floor();
        initial_index as usize + time_index
    }

    /// Row lengths of the ragged duration dimension for `time_points` rows
    pub fn row_lengths(&self, initial_duration: f64, time_points: usize) -> impl Iterator<Item = usize> + '_ {
        (0..time_points).map(move |t| self.duration_support_index(initial_duration, t) + 1)
    }

    /// Time (years) at a possibly fractional index
    pub fn index_to_time(&self, index: f64) -> f64 {
        index * self.step_size
    }
}

impl Default for DurationTimeGrid {
    fn default() -> Self {
        Self::monthly()
    }
}
