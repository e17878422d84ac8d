//! Projection of market cash flows and portfolio-wide reserves
//!
//! Combines probabilities, rho-modified probabilities and technical reserves into
//! cumulative expected cash flows per payment stream, and runs the whole pipeline
//! over a portfolio in parallel.

mod cashflows;
mod engine;
mod portfolio;

pub use cashflows::{CashFlowCalculator, PolicyCashFlows};
pub use engine::{PolicyProjection, ProjectionConfig, ProjectionEngine, ProjectionResult};
pub use portfolio::{portfolio_wide_bonus_reserve, portfolio_wide_original_reserve};
