//! Actuarial assumptions: intensity tables, market and technical bases, product catalogue

mod basis;
mod intensity;
pub mod product;

pub use basis::{
    greater_than_indicator, less_than_indicator, market_basis, TechnicalBasis, PENSION_AGE,
    TECHNICAL_INTEREST_RATE,
};
pub use intensity::{IntensityFn, IntensityModel, IntensityTable, IntensityTableBuilder};
pub use product::{
    attach_standard_products, deferred_disability_annuity, life_annuity, premium, standard_policy,
    ProductAmounts,
};

/// Container for the bases shared by all calculators
///
/// Immutable after construction, so one instance can be read by every
/// per-policy task of a parallel run.
#[derive(Debug, Clone)]
pub struct Assumptions {
    /// Gender-specific, duration-dependent best-estimate intensities
    pub market: IntensityModel,
    /// Duration-independent intensities and interest used for reserving
    pub technical: TechnicalBasis,
}

impl Assumptions {
    pub fn new(market: IntensityModel, technical: TechnicalBasis) -> Self {
        Self { market, technical }
    }

    /// Standard market basis with the 2% technical basis
    pub fn standard() -> Self {
        Self {
            market: market_basis(),
            technical: TechnicalBasis::standard(),
        }
    }
}
