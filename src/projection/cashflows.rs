//! Expected market cash flows of original and bonus payments
//!
//! Per time step, every state pays its continuous market payment and, on a
//! transition into a surrender state, the midpoint technical reserve of the state
//! left. The expected amount weights these rates with the duration increments of
//! the occupation probabilities:
//!
//! ```text
//! flow(t) = sum_legs sum_u [ b(x, y) + sum_k mu_jk(x, y) (V_surrender + b_jk(x, y)) ] (p[t][u] - p[t][u-1]) h
//! x = age + (t - 1/2) h,   y = (u - 1/2) h
//! ```
//!
//! Results are cumulative over time.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::assumptions::{IntensityModel, IntensityTable};
use crate::error::{ProjectionError, Result};
use crate::grid::DurationTimeGrid;
use crate::policy::{PaymentKey, Policy, Product, State, StateCollection};
use crate::probability::{PolicyProbabilities, ProbabilityTable, RaggedGrid};
use crate::reserves::{PolicyReserves, ReserveTable};

/// Cumulative expected cash flows of one policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyCashFlows {
    pub policy_id: String,
    pub original: Vec<f64>,
    pub bonus: Vec<f64>,
}

/// Probability mass of one state together with what it pays
struct Leg<'b> {
    state: State,
    probabilities: &'b RaggedGrid,
    products: Vec<&'b Product>,
    /// Paid out on surrender, per time index
    reserve: Vec<f64>,
}

impl Leg<'_> {
    /// Payments are defined on the standard states; free-policy states pay like their counterpart
    fn payment_state(&self) -> State {
        self.state.standard_equivalent()
    }
}

/// Aggregates probabilities, reserves and market payments into cash flows
pub struct CashFlowCalculator<'a> {
    intensities: &'a IntensityModel,
    grid: DurationTimeGrid,
}

impl<'a> CashFlowCalculator<'a> {
    pub fn new(intensities: &'a IntensityModel, grid: DurationTimeGrid) -> Self {
        Self { intensities, grid }
    }

    /// Cash flows for every policy, computed in parallel
    ///
    /// Without a rho-modified table the free-policy states contribute nothing to the
    /// original cash flows.
    pub fn calculate(
        &self,
        policies: &[Policy],
        probabilities: &ProbabilityTable,
        rho_probabilities: Option<&ProbabilityTable>,
        reserves: &ReserveTable,
    ) -> Result<BTreeMap<String, PolicyCashFlows>> {
        policies
            .par_iter()
            .map(|policy| -> Result<(String, PolicyCashFlows)> {
                let id = &policy.policy_id;
                let missing = || ProjectionError::MissingProbabilities { policy_id: id.clone() };
                let standard = probabilities.get(id).ok_or_else(missing)?;
                let rho = match rho_probabilities {
                    Some(table) => Some(table.get(id).ok_or_else(missing)?),
                    None => None,
                };
                let policy_reserves = reserves
                    .get(id)
                    .ok_or_else(|| ProjectionError::MissingReserves { policy_id: id.clone() })?;
                let cash_flows = self.calculate_policy(policy, standard, rho, policy_reserves)?;
                Ok((id.clone(), cash_flows))
            })
            .collect()
    }

    pub fn calculate_policy(
        &self,
        policy: &Policy,
        probabilities: &PolicyProbabilities,
        rho_probabilities: Option<&PolicyProbabilities>,
        reserves: &PolicyReserves,
    ) -> Result<PolicyCashFlows> {
        let time_points = probabilities.time_points();
        let check = |input: &'static str, actual: usize| {
            if actual == time_points {
                Ok(())
            } else {
                Err(ProjectionError::HorizonMismatch {
                    policy_id: policy.policy_id.clone(),
                    input,
                    expected: time_points,
                    actual,
                })
            }
        };
        check("technical reserves", reserves.time_points())?;
        if let Some(rho) = rho_probabilities {
            check("rho-modified probabilities", rho.time_points())?;
        }

        let original = self.original_cash_flows(policy, probabilities, rho_probabilities, reserves);
        let bonus = self.bonus_cash_flows(policy, probabilities, reserves);
        log::debug!(
            "Policy {}: cumulative original {:.4}, bonus {:.4}",
            policy.policy_id,
            original.last().copied().unwrap_or(0.0),
            bonus.last().copied().unwrap_or(0.0)
        );

        Ok(PolicyCashFlows {
            policy_id: policy.policy_id.clone(),
            original,
            bonus,
        })
    }

    /// Original benefits and premiums
    ///
    /// Standard states use the standard table and surrender the combined reserve;
    /// free-policy states use the rho-modified table, pay benefits only and surrender
    /// the benefit reserve.
    pub fn original_cash_flows(
        &self,
        policy: &Policy,
        probabilities: &PolicyProbabilities,
        rho_probabilities: Option<&PolicyProbabilities>,
        reserves: &PolicyReserves,
    ) -> Vec<f64> {
        let time_points = probabilities.time_points();
        let benefits = policy.payment(PaymentKey::ORIGINAL_POSITIVE);
        let premiums = policy.payment(PaymentKey::ORIGINAL_NEGATIVE);

        let mut legs = Vec::new();
        for &state in StateCollection::StandardWithSurrender.states() {
            let Some(grid) = probabilities.state(state) else {
                continue;
            };
            legs.push(Leg {
                state,
                probabilities: grid,
                products: benefits.into_iter().chain(premiums).collect(),
                reserve: (0..time_points).map(|i| reserves.original(state, i)).collect(),
            });
        }

        if let Some(rho) = rho_probabilities {
            for &state in StateCollection::FreePolicyStatesWithSurrender.states() {
                let Some(grid) = rho.state(state) else {
                    continue;
                };
                let standard = state.standard_equivalent();
                legs.push(Leg {
                    state,
                    probabilities: grid,
                    products: benefits.into_iter().collect(),
                    reserve: (0..time_points)
                        .map(|i| reserves.original_positive(standard, i))
                        .collect(),
                });
            }
        }

        self.accumulate(policy, &legs, time_points)
    }

    /// Bonus payments over all non-surrender states of the standard table
    pub fn bonus_cash_flows(
        &self,
        policy: &Policy,
        probabilities: &PolicyProbabilities,
        reserves: &PolicyReserves,
    ) -> Vec<f64> {
        let time_points = probabilities.time_points();
        let products: Vec<&Product> = policy
            .payment(PaymentKey::BONUS_POSITIVE)
            .into_iter()
            .chain(policy.payment(PaymentKey::BONUS_NEGATIVE))
            .collect();

        let legs: Vec<Leg> = StateCollection::AllStates
            .states()
            .iter()
            .filter(|state| !state.is_surrender())
            .filter_map(|&state| {
                let grid = probabilities.state(state)?;
                let standard = state.standard_equivalent();
                Some(Leg {
                    state,
                    probabilities: grid,
                    products: products.clone(),
                    reserve: (0..time_points).map(|i| reserves.bonus(standard, i)).collect(),
                })
            })
            .collect();

        self.accumulate(policy, &legs, time_points)
    }

    fn accumulate(&self, policy: &Policy, legs: &[Leg], time_points: usize) -> Vec<f64> {
        let table = self.intensities.for_gender(policy.gender);
        let h = self.grid.step_size();
        let mut cumulative = vec![0.0; time_points];

        for t in 1..time_points {
            let age = policy.attained_age(self.grid.index_to_time(t as f64 - 0.5));
            let mut flow = 0.0;

            for leg in legs {
                let row = leg.probabilities.row(t);
                let surrender_value = 0.5 * (leg.reserve[t - 1] + leg.reserve[t]);

                for u in 1..row.len() {
                    let duration = self.grid.index_to_time(u as f64 - 0.5);
                    let rate = payment_rate(table, leg, age, duration, surrender_value);
                    flow += rate * (row[u] - row[u - 1]) * h;
                }
            }

            cumulative[t] = cumulative[t - 1] + flow;
        }

        cumulative
    }
}

/// Continuous payments plus transition payments of a leg at one grid point
fn payment_rate(table: &IntensityTable, leg: &Leg, age: f64, duration: f64, surrender_value: f64) -> f64 {
    let payment_state = leg.payment_state();
    let mut rate = leg
        .products
        .iter()
        .filter_map(|product| product.market_payment(payment_state))
        .fold(0.0, |acc, payment| acc + payment(age, duration));

    for (to, intensity) in table.transitions_from(leg.state) {
        if to.is_surrender() {
            rate += intensity(age, duration) * surrender_value;
        }
        for product in &leg.products {
            if let Some(jump) = product.market_jump(payment_state, to.standard_equivalent()) {
                rate += intensity(age, duration) * jump(age, duration);
            }
        }
    }

    rate
}
