//! Market value of projected cash flows

use crate::grid::DurationTimeGrid;
use crate::scenario::ZeroCouponCurve;

/// Market reserve at `time_index` of a cumulative cash-flow curve
///
/// Each increment `A[i + 1] - A[i]` is discounted from the valuation time to the
/// midpoint of its step with the curve's bond price at the given short rate.
pub fn market_reserve(
    curve: &dyn ZeroCouponCurve,
    short_rate: f64,
    time_index: usize,
    grid: &DurationTimeGrid,
    cumulative_cash_flows: &[f64],
) -> f64 {
    let valuation_time = grid.index_to_time(time_index as f64);

    cumulative_cash_flows
        .windows(2)
        .enumerate()
        .skip(time_index)
        .map(|(i, pair)| {
            let payment_time = grid.index_to_time(i as f64 + 0.5);
            curve.price(short_rate, valuation_time, payment_time) * (pair[1] - pair[0])
        })
        .sum()
}
