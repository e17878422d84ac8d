//! Forward solver for state occupation probabilities
//!
//! Discretises the forward Kolmogorov equations of the semi-Markov model on the
//! ragged time x duration grid. `p[j][t][u]` approximates the probability of being
//! in state `j` at time index `t` with duration at most `u` steps.
//!
//! One step `t - 1 -> t` for each target state `j`:
//! 1. every source `l` with a registered `l -> j` rate contributes a midpoint
//!    Riemann sum over the duration increments of `p[l][t - 1]`;
//!    the diagonal entry (`l == j`) removes the cumulative outflow per duration,
//!    an inflow (`l != j`) adds the total at every duration since entry resets duration;
//! 2. the mass staying in `j` moves one duration step: `p[j][t][u] += p[j][t - 1][u - 1]`.

use std::collections::BTreeMap;

use rayon::prelude::*;

use super::table::{PolicyProbabilities, ProbabilityTable, RaggedGrid};
use crate::assumptions::{IntensityFn, IntensityModel, IntensityTable};
use crate::error::{ProjectionError, Result};
use crate::grid::DurationTimeGrid;
use crate::policy::{Policy, State, StateCollection};

/// Working grids indexed by state ordinal; `None` for states outside the state space
type StateGrids = [Option<RaggedGrid>; State::COUNT];

/// Computes standard and rho-modified probability tables on the market basis
pub struct ProbabilityCalculator<'a> {
    intensities: &'a IntensityModel,
    grid: DurationTimeGrid,
}

impl<'a> ProbabilityCalculator<'a> {
    pub fn new(intensities: &'a IntensityModel, grid: DurationTimeGrid) -> Self {
        Self { intensities, grid }
    }

    /// Standard probabilities for every policy, computed in parallel
    pub fn calculate(&self, policies: &[Policy]) -> Result<ProbabilityTable> {
        log::info!(
            "Calculating probabilities for {} policies (step size {})",
            policies.len(),
            self.grid.step_size()
        );
        policies
            .par_iter()
            .map(|policy| {
                self.calculate_policy(policy)
                    .map(|probabilities| (policy.policy_id.clone(), probabilities))
            })
            .collect()
    }

    /// Standard probabilities of one policy
    ///
    /// At time index 0 all mass sits in the initial state at the maximum duration index.
    pub fn calculate_policy(&self, policy: &Policy) -> Result<PolicyProbabilities> {
        let states = self.intensities.state_space();
        if !states.contains(&policy.initial_state) {
            return Err(ProjectionError::InvalidPolicy {
                policy_id: policy.policy_id.clone(),
                reason: format!("initial state {:?} has no registered transitions", policy.initial_state),
            });
        }

        let time_points = self.grid.number_of_time_points(policy, policy.initial_time)?;
        log::debug!(
            "Policy {}: {} time points, initial duration index {}",
            policy.policy_id,
            time_points,
            self.grid.duration_support_index(policy.initial_duration, 0)
        );

        let mut grids = self.allocate(policy, time_points, &states);
        if time_points == 0 {
            return Ok(into_probabilities(policy, time_points, grids));
        }

        let start = self.grid.duration_support_index(policy.initial_duration, 0);
        if let Some(grid) = grids[policy.initial_state.index()].as_mut() {
            grid.row_mut(0)[start] = 1.0;
        }

        let table = self.intensities.for_gender(policy.gender);
        let mut cumulative = Vec::new();

        for t in 1..time_points {
            let age = policy.attained_age(self.grid.index_to_time(t as f64 - 0.5));
            let width = self.grid.duration_support_index(policy.initial_duration, t) + 1;

            for &target in &states {
                let mut next = vec![0.0; width];
                self.add_transitions(table, &states, &grids, target, t, age, policy.initial_duration, &mut next, &mut cumulative);
                self.store(&mut grids, target, t, next);
            }
        }

        Ok(into_probabilities(policy, time_points, grids))
    }

    /// Rho-modified probabilities for every policy, computed in parallel
    pub fn calculate_rho(
        &self,
        policies: &[Policy],
        probabilities: &ProbabilityTable,
        free_policy_factors: &BTreeMap<String, Vec<f64>>,
    ) -> Result<ProbabilityTable> {
        log::info!("Calculating rho-modified probabilities for {} policies", policies.len());
        policies
            .par_iter()
            .map(|policy| -> Result<(String, PolicyProbabilities)> {
                let standard = probabilities.get(&policy.policy_id).ok_or_else(|| {
                    ProjectionError::MissingProbabilities {
                        policy_id: policy.policy_id.clone(),
                    }
                })?;
                let factor = free_policy_factors.get(&policy.policy_id).ok_or_else(|| {
                    ProjectionError::MissingFreePolicyFactor {
                        policy_id: policy.policy_id.clone(),
                    }
                })?;
                let rho = self.calculate_rho_policy(policy, standard, factor)?;
                Ok((policy.policy_id.clone(), rho))
            })
            .collect()
    }

    /// Probabilities of the free-policy states, with paid-up conversions scaled by the free-policy factor
    ///
    /// All free-policy states start at zero. Conversions into `FreePolicyActive` (and
    /// `FreePolicyDisabled` when registered) are taken from the standard probability
    /// increments of the corresponding standard state, weighted with the factor averaged
    /// over the step.
    pub fn calculate_rho_policy(
        &self,
        policy: &Policy,
        standard: &PolicyProbabilities,
        free_policy_factor: &[f64],
    ) -> Result<PolicyProbabilities> {
        if !StateCollection::RhoModifiedFromStates.contains(policy.initial_state) {
            return Err(ProjectionError::InvalidInitialState {
                policy_id: policy.policy_id.clone(),
                state: policy.initial_state,
            });
        }

        let time_points = self.grid.number_of_time_points(policy, policy.initial_time)?;
        if standard.time_points() != time_points {
            return Err(ProjectionError::HorizonMismatch {
                policy_id: policy.policy_id.clone(),
                input: "standard probabilities",
                expected: time_points,
                actual: standard.time_points(),
            });
        }
        if free_policy_factor.len() != time_points {
            return Err(ProjectionError::FactorLength {
                policy_id: policy.policy_id.clone(),
                expected: time_points,
                actual: free_policy_factor.len(),
            });
        }

        let states: Vec<State> = self
            .intensities
            .state_space()
            .into_iter()
            .filter(|state| state.is_free_policy())
            .collect();
        let mut grids = self.allocate(policy, time_points, &states);

        let table = self.intensities.for_gender(policy.gender);
        let mut cumulative = Vec::new();

        for t in 1..time_points {
            let age = policy.attained_age(self.grid.index_to_time(t as f64 - 0.5));
            let width = self.grid.duration_support_index(policy.initial_duration, t) + 1;
            let factor = 0.5 * (free_policy_factor[t - 1] + free_policy_factor[t]);

            for &target in &states {
                let mut next = vec![0.0; width];
                self.add_transitions(table, &states, &grids, target, t, age, policy.initial_duration, &mut next, &mut cumulative);

                for &from in StateCollection::RhoModifiedFromStates.states() {
                    if from.free_policy_equivalent() != target {
                        continue;
                    }
                    let (Some(rate), Some(grid)) = (table.get(from, target), standard.state(from)) else {
                        continue;
                    };
                    let mut converted = self.total_flow(grid.row(t - 1), rate, age, policy.initial_duration);
                    converted *= factor;
                    for value in &mut next[1..] {
                        *value += converted;
                    }
                }

                self.store(&mut grids, target, t, next);
            }
        }

        Ok(into_probabilities(policy, time_points, grids))
    }

    fn allocate(&self, policy: &Policy, time_points: usize, states: &[State]) -> StateGrids {
        std::array::from_fn(|i| {
            states
                .contains(&State::ALL[i])
                .then(|| RaggedGrid::for_policy(&self.grid, policy.initial_duration, time_points))
        })
    }

    /// Inflow and outflow terms of `target` for the step `t - 1 -> t`
    #[allow(clippy::too_many_arguments)]
    fn add_transitions(
        &self,
        table: &IntensityTable,
        sources: &[State],
        grids: &StateGrids,
        target: State,
        t: usize,
        age: f64,
        initial_duration: f64,
        next: &mut [f64],
        cumulative: &mut Vec<f64>,
    ) {
        let current = next.len() - 1;

        for &source in sources {
            let (Some(rate), Some(grid)) = (table.get(source, target), grids[source.index()].as_ref()) else {
                continue;
            };
            self.integrate_flow(grid.row(t - 1), rate, age, initial_duration, cumulative);

            if source == target {
                for (value, outflow) in next.iter_mut().zip(cumulative.iter()).skip(1) {
                    *value -= outflow;
                }
            } else {
                let inflow = cumulative[current];
                for value in &mut next[1..] {
                    *value += inflow;
                }
            }
        }
    }

    /// Cumulative midpoint Riemann sum of `rate` over the duration increments of `row`
    ///
    /// `cumulative[u + 1]` holds the flow from durations up to `u`; the result has one
    /// entry more than `row`.
    fn integrate_flow(&self, row: &[f64], rate: &IntensityFn, age: f64, initial_duration: f64, cumulative: &mut Vec<f64>) {
        let h = self.grid.step_size();
        cumulative.clear();
        cumulative.resize(row.len() + 1, 0.0);

        for u in 1..row.len() {
            let duration = initial_duration + self.grid.index_to_time(u as f64 - 0.5);
            cumulative[u + 1] = cumulative[u] + (row[u] - row[u - 1]) * rate(age, duration) * h;
        }
    }

    /// Total midpoint Riemann sum of `rate` over the duration increments of `row`
    fn total_flow(&self, row: &[f64], rate: &IntensityFn, age: f64, initial_duration: f64) -> f64 {
        let h = self.grid.step_size();
        let mut total = 0.0;
        for u in 1..row.len() {
            let duration = initial_duration + self.grid.index_to_time(u as f64 - 0.5);
            total += (row[u] - row[u - 1]) * rate(age, duration) * h;
        }
        total
    }

    /// Add the duration shift of `target` and write row `t`
    fn store(&self, grids: &mut StateGrids, target: State, t: usize, mut next: Vec<f64>) {
        let Some(grid) = grids[target.index()].as_mut() else {
            return;
        };
        for (value, staying) in next[1..].iter_mut().zip(grid.row(t - 1)) {
            *value += staying;
        }
        grid.row_mut(t).copy_from_slice(&next);
    }
}

fn into_probabilities(policy: &Policy, time_points: usize, grids: StateGrids) -> PolicyProbabilities {
    let states = State::ALL
        .into_iter()
        .zip(grids)
        .filter_map(|(state, grid)| grid.map(|grid| (state, grid)))
        .collect();
    PolicyProbabilities::new(policy.policy_id.clone(), time_points, states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::{market_basis, standard_policy, TechnicalBasis};
    use crate::policy::Gender;
    use crate::reserves::TechnicalReserveCalculator;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn short_policy(id: &str, gender: Gender, initial_state: State, initial_duration: f64) -> Policy {
        Policy::new(id, 18.0, gender, 20.0, initial_state, initial_duration, 0.0).unwrap()
    }

    fn assert_normalized(probabilities: &PolicyProbabilities) {
        for t in 0..probabilities.time_points() {
            let total: f64 = probabilities
                .states()
                .map(|state| probabilities.at_max_duration(state, t))
                .sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_regression_active_at_max_duration() {
        init_logger();
        let intensities = market_basis();
        let calculator = ProbabilityCalculator::new(&intensities, DurationTimeGrid::monthly());
        let policy = standard_policy().unwrap();

        let probabilities = calculator.calculate_policy(&policy).unwrap();
        let active = probabilities.state(State::Active).unwrap();

        let expected = [
            1.0,
            0.9889314944965978,
            0.9779928395115511,
            0.9671824333345161,
            0.9564986948862244,
        ];
        for (t, value) in expected.iter().enumerate() {
            assert_abs_diff_eq!(active.at_max_duration(t), *value, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_golden_rows_at_time_20() {
        init_logger();
        let intensities = market_basis();
        let technical = TechnicalBasis::standard();
        let grid = DurationTimeGrid::monthly();
        let policy = standard_policy().unwrap();

        let probabilities = ProbabilityCalculator::new(&intensities, grid)
            .calculate_policy(&policy)
            .unwrap();
        let factor = TechnicalReserveCalculator::new(&technical, grid)
            .calculate_policy(&policy)
            .unwrap()
            .free_policy_factor();
        let rho = ProbabilityCalculator::new(&intensities, grid)
            .calculate_rho_policy(&policy, &probabilities, &factor)
            .unwrap();

        let active = probabilities.state(State::Active).unwrap().row(20);
        assert_eq!(active.len(), EXPECTED_ACTIVE_ROW_20.len());
        for (actual, expected) in active.iter().zip(EXPECTED_ACTIVE_ROW_20.iter()) {
            assert_relative_eq!(*actual, *expected, epsilon = 1e-16, max_relative = 1e-10);
        }

        let free_policy_active = rho.state(State::FreePolicyActive).unwrap().row(20);
        assert_eq!(free_policy_active.len(), EXPECTED_RHO_FREE_POLICY_ACTIVE_ROW_20.len());
        for (actual, expected) in free_policy_active
            .iter()
            .zip(EXPECTED_RHO_FREE_POLICY_ACTIVE_ROW_20.iter())
        {
            assert_relative_eq!(*actual, *expected, epsilon = 1e-16, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_normalized_over_full_horizon() {
        let intensities = market_basis();
        let calculator = ProbabilityCalculator::new(&intensities, DurationTimeGrid::monthly());
        let probabilities = calculator.calculate_policy(&standard_policy().unwrap()).unwrap();

        assert_eq!(probabilities.time_points(), 1081);
        assert_normalized(&probabilities);
    }

    #[test]
    fn test_normalized_for_other_starts() {
        let intensities = market_basis();
        let calculator = ProbabilityCalculator::new(&intensities, DurationTimeGrid::monthly());

        for (gender, state, duration) in [
            (Gender::Female, State::Active, 0.0),
            (Gender::Male, State::Disabled, 1.5),
            (Gender::Female, State::FreePolicyDisabled, 3.0),
            (Gender::Male, State::Dead, 0.0),
        ] {
            let policy = short_policy("short", gender, state, duration);
            let probabilities = calculator.calculate_policy(&policy).unwrap();
            assert_eq!(probabilities.time_points(), 241);
            assert_normalized(&probabilities);
        }
    }

    #[test]
    fn test_probabilities_depend_on_duration() {
        let intensities = market_basis();
        let calculator = ProbabilityCalculator::new(&intensities, DurationTimeGrid::monthly());
        let probabilities = calculator.calculate_policy(&standard_policy().unwrap()).unwrap();
        let active = probabilities.state(State::Active).unwrap();

        for t in 1..probabilities.time_points() {
            let row = active.row(t);
            assert!(row.iter().any(|value| *value != row[0]), "time index {}", t);
        }
    }

    #[test]
    fn test_initial_row() {
        let intensities = market_basis();
        let calculator = ProbabilityCalculator::new(&intensities, DurationTimeGrid::monthly());
        let policy = short_policy("init", Gender::Male, State::Disabled, 0.5);
        let probabilities = calculator.calculate_policy(&policy).unwrap();

        let disabled = probabilities.state(State::Disabled).unwrap();
        assert_eq!(disabled.row(0), &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(probabilities.at_max_duration(State::Active, 0), 0.0);
    }

    #[test]
    fn test_misaligned_expiry_fails() {
        let intensities = market_basis();
        let calculator = ProbabilityCalculator::new(&intensities, DurationTimeGrid::monthly());
        let policy = Policy::new("bad", 30.0, Gender::Male, 90.05, State::Active, 0.0, 0.0).unwrap();

        let err = calculator.calculate_policy(&policy).unwrap_err();
        assert!(matches!(err, ProjectionError::Alignment { .. }));
    }

    #[test]
    fn test_rho_requires_active_or_disabled_start() {
        let intensities = market_basis();
        let calculator = ProbabilityCalculator::new(&intensities, DurationTimeGrid::monthly());
        let policy = short_policy("dead", Gender::Male, State::Dead, 0.0);
        let standard = calculator.calculate_policy(&policy).unwrap();
        let factor = vec![1.0; standard.time_points()];

        let err = calculator.calculate_rho_policy(&policy, &standard, &factor).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::InvalidInitialState { state: State::Dead, .. }
        ));
    }

    #[test]
    fn test_rho_factor_length_checked() {
        let intensities = market_basis();
        let calculator = ProbabilityCalculator::new(&intensities, DurationTimeGrid::monthly());
        let policy = short_policy("short", Gender::Male, State::Active, 0.0);
        let standard = calculator.calculate_policy(&policy).unwrap();

        let err = calculator.calculate_rho_policy(&policy, &standard, &[1.0; 3]).unwrap_err();
        assert!(matches!(err, ProjectionError::FactorLength { expected: 241, actual: 3, .. }));
    }

    #[test]
    fn test_rho_with_unit_factor_matches_standard_free_policy_mass() {
        // Starting from Active, a factor of one makes the rho table equal to the standard one
        let intensities = market_basis();
        let calculator = ProbabilityCalculator::new(&intensities, DurationTimeGrid::monthly());
        let policy = short_policy("unit", Gender::Female, State::Active, 1.0);
        let standard = calculator.calculate_policy(&policy).unwrap();
        let factor = vec![1.0; standard.time_points()];

        let rho = calculator.calculate_rho_policy(&policy, &standard, &factor).unwrap();

        assert_eq!(
            rho.states().collect::<Vec<_>>(),
            StateCollection::FreePolicyStatesWithSurrender.states().to_vec()
        );
        for state in rho.states() {
            for t in 0..rho.time_points() {
                for (a, b) in rho.state(state).unwrap().row(t).iter().zip(standard.state(state).unwrap().row(t)) {
                    assert_abs_diff_eq!(*a, *b, epsilon = 1e-13);
                }
            }
        }
    }

    #[test]
    fn test_calculate_portfolio_in_parallel() {
        init_logger();
        let intensities = market_basis();
        let calculator = ProbabilityCalculator::new(&intensities, DurationTimeGrid::monthly());
        let policies = vec![
            short_policy("a", Gender::Male, State::Active, 0.0),
            short_policy("b", Gender::Female, State::Disabled, 2.0),
        ];

        let table = calculator.calculate(&policies).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["b"], calculator.calculate_policy(&policies[1]).unwrap());

        let factors: BTreeMap<String, Vec<f64>> = policies
            .iter()
            .map(|policy| (policy.policy_id.clone(), vec![0.5; 241]))
            .collect();
        let rho = calculator.calculate_rho(&policies, &table, &factors).unwrap();
        assert_eq!(rho.len(), 2);
        assert!(rho["a"].at_max_duration(State::FreePolicyActive, 240) > 0.0);

        let err = calculator.calculate_rho(&policies, &table, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ProjectionError::MissingFreePolicyFactor { .. }));
    }

    const EXPECTED_ACTIVE_ROW_20: [f64; 81] = [
        0.0, 2.2541154218157805e-06, 4.383610489687725e-06,
        6.389154387338661e-06, 8.27141573349253e-06, 1.0031062523852377e-05,
        1.166876207425931e-05, 1.3185180965014722e-05, 1.4580984986348343e-05,
        1.585683908501482e-05, 1.7013407312001887e-05, 1.8051352771333342e-05,
        1.897133756995025e-05, 1.9774022768654133e-05, 2.046006833409591e-05,
        2.1030133091794876e-05, 2.148487468017188e-05, 2.182494950558136e-05,
        2.2051012698326975e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 2.2163718069645707e-05,
        2.2163718069645707e-05, 2.2163718069645707e-05, 0.8015713584523593,
    ];

    const EXPECTED_RHO_FREE_POLICY_ACTIVE_ROW_20: [f64; 81] = [
        0.0, 0.0008915432547013447, 0.0017741199359331172,
        0.002647544172087674, 0.0035116277817134186, 0.004366180249184206,
        0.005211008700133699, 0.006045917876652506, 0.006870710112245933,
        0.007685185306550126, 0.008489140899804392, 0.009282371847077463,
        0.01006467059224541, 0.010835827041718971, 0.011595628537917953,
        0.012343859832490383, 0.0130803030592741, 0.013804737706998391,
        0.014516940591723317, 0.015216685829014249, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
        0.015903744805849298, 0.015903744805849298, 0.015903744805849298,
    ];
}
