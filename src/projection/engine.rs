//! Projection pipeline over a portfolio of policies
//!
//! Per policy: technical reserves -> free-policy factor -> probabilities ->
//! rho-modified probabilities -> market cash flows -> portfolio-wide reserves.
//! Each policy is an independent task of a parallel map; shared assumptions are
//! read-only and every task owns its outputs.

use std::collections::BTreeMap;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::cashflows::{CashFlowCalculator, PolicyCashFlows};
use super::portfolio::{portfolio_wide_bonus_reserve, portfolio_wide_original_reserve};
use crate::assumptions::Assumptions;
use crate::error::Result;
use crate::grid::DurationTimeGrid;
use crate::policy::Policy;
use crate::probability::{PolicyProbabilities, ProbabilityCalculator, ProbabilityTable};
use crate::reserves::{PolicyReserves, ReserveTable, TechnicalReserveCalculator};

/// Configuration for a projection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Time and duration step (years)
    pub step_size: f64,

    /// Whether to compute the rho-modified free-policy probabilities
    pub calculate_rho: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            step_size: 1.0 / 12.0, // monthly
            calculate_rho: true,
        }
    }
}

impl ProjectionConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.grid()?;
        Ok(config)
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn grid(&self) -> Result<DurationTimeGrid> {
        DurationTimeGrid::new(self.step_size)
    }
}

/// Everything computed for one policy
#[derive(Debug, Clone, Serialize)]
pub struct PolicyProjection {
    pub policy_id: String,
    pub probabilities: PolicyProbabilities,
    pub rho_probabilities: Option<PolicyProbabilities>,
    pub technical_reserves: PolicyReserves,
    pub free_policy_factor: Vec<f64>,
    pub cash_flows: PolicyCashFlows,
    pub portfolio_wide_original_reserve: Vec<f64>,
    pub portfolio_wide_bonus_reserve: Vec<f64>,
}

/// Results of a portfolio run, each keyed by policy id
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectionResult {
    pub probabilities: ProbabilityTable,
    pub rho_probabilities: ProbabilityTable,
    pub technical_reserves: ReserveTable,
    pub free_policy_factors: BTreeMap<String, Vec<f64>>,
    pub market_original_cash_flows: BTreeMap<String, Vec<f64>>,
    pub market_bonus_cash_flows: BTreeMap<String, Vec<f64>>,
    pub portfolio_wide_original_reserves: BTreeMap<String, Vec<f64>>,
    pub portfolio_wide_bonus_reserves: BTreeMap<String, Vec<f64>>,
}

impl ProjectionResult {
    fn insert(&mut self, projection: PolicyProjection) {
        let id = projection.policy_id;
        self.probabilities.insert(id.clone(), projection.probabilities);
        if let Some(rho) = projection.rho_probabilities {
            self.rho_probabilities.insert(id.clone(), rho);
        }
        self.technical_reserves.insert(id.clone(), projection.technical_reserves);
        self.free_policy_factors.insert(id.clone(), projection.free_policy_factor);
        self.market_original_cash_flows
            .insert(id.clone(), projection.cash_flows.original);
        self.market_bonus_cash_flows
            .insert(id.clone(), projection.cash_flows.bonus);
        self.portfolio_wide_original_reserves
            .insert(id.clone(), projection.portfolio_wide_original_reserve);
        self.portfolio_wide_bonus_reserves
            .insert(id, projection.portfolio_wide_bonus_reserve);
    }
}

/// Main projection engine
pub struct ProjectionEngine {
    assumptions: Assumptions,
    config: ProjectionConfig,
    grid: DurationTimeGrid,
}

impl ProjectionEngine {
    /// Create a new projection engine with given assumptions and config
    pub fn new(assumptions: Assumptions, config: ProjectionConfig) -> Result<Self> {
        let grid = config.grid()?;
        Ok(Self {
            assumptions,
            config,
            grid,
        })
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Run every policy in parallel
    ///
    /// A failing policy aborts the run with its error; other policies' outputs are
    /// never shared with it. With `calculate_rho` set, every policy must start in
    /// Active or Disabled.
    pub fn run(&self, policies: &[Policy]) -> Result<ProjectionResult> {
        log::info!(
            "Projecting {} policies (step size {}, rho {})",
            policies.len(),
            self.grid.step_size(),
            self.config.calculate_rho
        );

        let projections: Vec<PolicyProjection> = policies
            .par_iter()
            .map(|policy| self.run_policy(policy))
            .collect::<Result<_>>()?;

        let mut result = ProjectionResult::default();
        for projection in projections {
            result.insert(projection);
        }
        Ok(result)
    }

    /// Run the full pipeline for a single policy
    pub fn run_policy(&self, policy: &Policy) -> Result<PolicyProjection> {
        let technical_reserves =
            TechnicalReserveCalculator::new(&self.assumptions.technical, self.grid).calculate_policy(policy)?;
        let free_policy_factor = technical_reserves.free_policy_factor();

        let probability_calculator = ProbabilityCalculator::new(&self.assumptions.market, self.grid);
        let probabilities = probability_calculator.calculate_policy(policy)?;

        // Fails with InvalidInitialState unless the policy starts in Active or Disabled
        let rho_probabilities = if self.config.calculate_rho {
            Some(probability_calculator.calculate_rho_policy(policy, &probabilities, &free_policy_factor)?)
        } else {
            None
        };

        let cash_flows = CashFlowCalculator::new(&self.assumptions.market, self.grid).calculate_policy(
            policy,
            &probabilities,
            rho_probabilities.as_ref(),
            &technical_reserves,
        )?;

        let portfolio_wide_original_reserve =
            portfolio_wide_original_reserve(&probabilities, rho_probabilities.as_ref(), &technical_reserves);
        let portfolio_wide_bonus_reserve = portfolio_wide_bonus_reserve(&probabilities, &technical_reserves);

        Ok(PolicyProjection {
            policy_id: policy.policy_id.clone(),
            probabilities,
            rho_probabilities,
            technical_reserves,
            free_policy_factor,
            cash_flows,
            portfolio_wide_original_reserve,
            portfolio_wide_bonus_reserve,
        })
    }
}
