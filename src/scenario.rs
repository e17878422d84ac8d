//! Interface to the economic scenario generator
//!
//! The projection layer only needs zero-coupon bond prices given the current
//! short rate. Short-rate and equity simulation live outside this crate.

use serde::{Deserialize, Serialize};

/// Zero-coupon bond prices as a function of the short rate
pub trait ZeroCouponCurve: Send + Sync {
    /// Price at time `t` of a unit paid at `maturity`, given the short rate at `t`
    fn price(&self, short_rate: f64, t: f64, maturity: f64) -> f64;

    /// Derivative of `price` with respect to the short rate
    fn price_derivative(&self, short_rate: f64, t: f64, maturity: f64) -> f64;
}

/// Curve implied by a short rate held constant until maturity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatRateCurve;

impl ZeroCouponCurve for FlatRateCurve {
    fn price(&self, short_rate: f64, t: f64, maturity: f64) -> f64 {
        (-short_rate * (maturity - t)).exp()
    }

    fn price_derivative(&self, short_rate: f64, t: f64, maturity: f64) -> f64 {
        -(maturity - t) * self.price(short_rate, t, maturity)
    }
}
