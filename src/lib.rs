//! Semi-Markov projection - multi-state life insurance projection engine
//!
//! This library provides:
//! - Forward Kolmogorov state occupation probabilities on a time x duration grid
//! - Rho-modified free-policy probabilities for paid-up conversion
//! - Technical reserves by backward Thiele recursion and the free-policy factor
//! - Cumulative market cash flows and portfolio-wide technical reserves
//! - Market reserves against a zero-coupon curve

pub mod error;
pub mod grid;
pub mod policy;
pub mod assumptions;
pub mod probability;
pub mod reserves;
pub mod projection;
pub mod scenario;

// Re-export commonly used types
pub use error::{ProjectionError, Result};
pub use grid::DurationTimeGrid;
pub use policy::{Gender, PaymentKey, Policy, Product, State, StateCollection};
pub use assumptions::{Assumptions, IntensityModel, IntensityTable, TechnicalBasis};
pub use probability::{PolicyProbabilities, ProbabilityCalculator, ProbabilityTable};
pub use reserves::{PolicyReserves, ReserveTable, TechnicalReserveCalculator};
pub use projection::{ProjectionConfig, ProjectionEngine, ProjectionResult};
pub use scenario::{FlatRateCurve, ZeroCouponCurve};
