//! Error types for the projection core
//!
//! Precondition violations (grid alignment, invalid initial state for the
//! rho-modified probabilities, malformed policies) are fatal for the policy they
//! concern. Numeric edge cases are handled locally and never surface here.

use thiserror::Error;

use crate::policy::State;

/// Errors raised by the calculators and the input loaders
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Expiry age or start time is not a multiple of the step size
    #[error(
        "policy {policy_id}: expiry age {expiry_age} and start time {start_time} are not aligned to step size {step_size}"
    )]
    Alignment {
        policy_id: String,
        expiry_age: f64,
        start_time: f64,
        step_size: f64,
    },

    /// Rho-modified probabilities requested for a policy not starting in Active or Disabled
    #[error("policy {policy_id}: rho-modified probabilities require initial state Active or Disabled, got {state:?}")]
    InvalidInitialState { policy_id: String, state: State },

    /// Static policy attributes violate an invariant
    #[error("policy {policy_id}: {reason}")]
    InvalidPolicy { policy_id: String, reason: String },

    /// No free-policy factor series supplied for a policy
    #[error("policy {policy_id}: no free-policy factor available")]
    MissingFreePolicyFactor { policy_id: String },

    /// Free-policy factor series does not cover the probability grid
    #[error("policy {policy_id}: free-policy factor has {actual} time points, expected {expected}")]
    FactorLength {
        policy_id: String,
        expected: usize,
        actual: usize,
    },

    /// Two inputs of the same policy cover different numbers of time points
    #[error("policy {policy_id}: {input} cover {actual} time points, expected {expected}")]
    HorizonMismatch {
        policy_id: String,
        input: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Standard probabilities missing when the rho-modified table is requested
    #[error("policy {policy_id}: standard probabilities have not been calculated")]
    MissingProbabilities { policy_id: String },

    /// Technical reserves missing when cash flows are requested
    #[error("policy {policy_id}: technical reserves have not been calculated")]
    MissingReserves { policy_id: String },

    /// Invalid calculation configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unrecognised value in an input file
    #[error("invalid {field}: {value}")]
    Parse { field: &'static str, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ProjectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_error_display() {
        let err = ProjectionError::Alignment {
            policy_id: "policy1".to_string(),
            expiry_age: 90.05,
            start_time: 0.0,
            step_size: 1.0 / 12.0,
        };
        let message = err.to_string();
        assert!(message.contains("policy1"));
        assert!(message.contains("90.05"));
    }

    #[test]
    fn test_invalid_initial_state_display() {
        let err = ProjectionError::InvalidInitialState {
            policy_id: "p".to_string(),
            state: State::Dead,
        };
        assert!(err.to_string().contains("Dead"));
    }
}
