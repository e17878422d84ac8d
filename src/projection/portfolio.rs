//! Portfolio-wide technical reserves
//!
//! The technical reserves of each state weighted with the probability of occupying
//! that state at time index `t`, irrespective of duration. Surrender and death carry
//! no reserve, so surrender states are left out of the sums.

use crate::policy::StateCollection;
use crate::probability::PolicyProbabilities;
use crate::reserves::PolicyReserves;

/// Original reserve over standard states plus the paid-up benefit reserve over free-policy states
///
/// ```text
/// V(t) = sum_{j standard} V_j(t) p_j(t) + sum_{j free policy} V+_{j'}(t) p^rho_j(t)
/// ```
pub fn portfolio_wide_original_reserve(
    probabilities: &PolicyProbabilities,
    rho_probabilities: Option<&PolicyProbabilities>,
    reserves: &PolicyReserves,
) -> Vec<f64> {
    (0..probabilities.time_points())
        .map(|t| {
            let standard: f64 = StateCollection::Standard
                .states()
                .iter()
                .map(|&state| reserves.original(state, t) * probabilities.at_max_duration(state, t))
                .sum();
            let free_policy: f64 = rho_probabilities.map_or(0.0, |rho| {
                StateCollection::FreePolicyStates
                    .states()
                    .iter()
                    .map(|&state| {
                        reserves.original_positive(state.standard_equivalent(), t) * rho.at_max_duration(state, t)
                    })
                    .sum()
            });
            standard + free_policy
        })
        .collect()
}

/// Bonus reserve over all non-surrender states of the standard table
pub fn portfolio_wide_bonus_reserve(probabilities: &PolicyProbabilities, reserves: &PolicyReserves) -> Vec<f64> {
    (0..probabilities.time_points())
        .map(|t| {
            StateCollection::AllStates
                .states()
                .iter()
                .filter(|state| !state.is_surrender())
                .map(|&state| reserves.bonus(state.standard_equivalent(), t) * probabilities.at_max_duration(state, t))
                .sum()
        })
        .collect()
}
