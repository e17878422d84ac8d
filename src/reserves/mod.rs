//! Technical and market reserves
//!
//! - **Technical reserves**: backward Thiele recursion on the technical basis, per
//!   payment stream, sign and state, plus the free-policy factor derived from them
//! - **Market reserves**: discounted value of projected cumulative cash flows
//!
//! # Example
//!
//! ```rust,ignore
//! use semimarkov_projection::assumptions::{standard_policy, TechnicalBasis};
//! use semimarkov_projection::grid::DurationTimeGrid;
//! use semimarkov_projection::reserves::TechnicalReserveCalculator;
//!
//! let basis = TechnicalBasis::standard();
//! let calculator = TechnicalReserveCalculator::new(&basis, DurationTimeGrid::monthly());
//! let reserves = calculator.calculate_policy(&standard_policy()?)?;
//! let factor = reserves.free_policy_factor();
//! ```

mod discount;
mod technical;
mod types;

pub use discount::market_reserve;
pub use technical::TechnicalReserveCalculator;
pub use types::{PolicyReserves, ReserveTable};
