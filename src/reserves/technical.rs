//! Technical reserves by backward recursion of Thiele's equation
//!
//! For every product attached to a policy and every state except Dead, starting
//! from a zero terminal reserve:
//!
//! ```text
//! dV_j = b_j(x) - (r + mu_j.(x)) V_j(i+1) + sum_{k != j} mu_jk(x) (V_k(i+1) + b_jk(x))
//! V_j(i) = dV_j h + V_j(i+1),    x = age + (i + 1/2) h
//! ```
//!
//! The technical basis has no duration dependence, so reserves are one-dimensional
//! in time.

use std::collections::BTreeMap;

use rayon::prelude::*;

use super::types::{PolicyReserves, ReserveTable};
use crate::assumptions::TechnicalBasis;
use crate::error::Result;
use crate::grid::DurationTimeGrid;
use crate::policy::{Policy, Product, State};

/// Computes technical reserves on the technical basis
pub struct TechnicalReserveCalculator<'a> {
    basis: &'a TechnicalBasis,
    grid: DurationTimeGrid,
}

impl<'a> TechnicalReserveCalculator<'a> {
    pub fn new(basis: &'a TechnicalBasis, grid: DurationTimeGrid) -> Self {
        Self { basis, grid }
    }

    /// Reserves for every policy, computed in parallel
    pub fn calculate(&self, policies: &[Policy]) -> Result<ReserveTable> {
        log::info!(
            "Calculating technical reserves for {} policies (interest {})",
            policies.len(),
            self.basis.interest_rate
        );
        policies
            .par_iter()
            .map(|policy| {
                self.calculate_policy(policy)
                    .map(|reserves| (policy.policy_id.clone(), reserves))
            })
            .collect()
    }

    /// Reserves of every product attached to a policy
    pub fn calculate_policy(&self, policy: &Policy) -> Result<PolicyReserves> {
        let time_points = self.grid.number_of_time_points(policy, policy.initial_time)?;
        log::debug!("Policy {}: technical reserves over {} time points", policy.policy_id, time_points);

        let reserves = policy
            .payments()
            .map(|(key, product)| (key, self.thiele(policy, product, time_points)))
            .collect();

        Ok(PolicyReserves::new(policy.policy_id.clone(), time_points, reserves))
    }

    fn thiele(&self, policy: &Policy, product: &Product, time_points: usize) -> BTreeMap<State, Vec<f64>> {
        let table = &self.basis.intensities;
        let states = table.states();
        let h = self.grid.step_size();
        let mut reserves = vec![vec![0.0; time_points]; State::COUNT];

        for i in (0..time_points.saturating_sub(1)).rev() {
            let age = policy.attained_age(self.grid.index_to_time(i as f64 + 0.5));

            for &state in &states {
                if state == State::Dead {
                    continue;
                }
                let next = reserves[state.index()][i + 1];
                let payment = product.technical_payment(state).map_or(0.0, |b| b(age));

                let mut derivative =
                    payment - (self.basis.interest_rate + table.total_outflow(state, age, 0.0)) * next;
                for (to, rate) in table.transitions_from(state) {
                    let target = reserves[to.index()][i + 1];
                    derivative += match product.technical_jump(state, to) {
                        Some(jump) => (target + jump(age)) * rate(age, 0.0),
                        None => target * rate(age, 0.0),
                    };
                }

                reserves[state.index()][i] = derivative * h + next;
            }
        }

        states
            .into_iter()
            .map(|state| (state, std::mem::take(&mut reserves[state.index()])))
            .collect()
    }
}
