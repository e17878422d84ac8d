//! State occupation probabilities of the semi-Markov model
//!
//! - **Standard table**: probabilities of every state in the market state space,
//!   normalised to one at each time index's maximum duration.
//! - **Rho-modified table**: probabilities of the free-policy states where the
//!   paid-up conversions are scaled by the free-policy factor.

mod calculator;
mod table;

pub use calculator::ProbabilityCalculator;
pub use table::{PolicyProbabilities, ProbabilityTable, RaggedGrid};
