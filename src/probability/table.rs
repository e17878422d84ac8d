//! Occupation probability tables over the ragged time x duration grid

use std::collections::BTreeMap;

use serde::Serialize;

use crate::grid::DurationTimeGrid;
use crate::policy::State;

/// Values indexed by `[time][duration]`, each row possibly of different length
///
/// Stored as one flat buffer with row offsets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaggedGrid {
    values: Vec<f64>,
    offsets: Vec<usize>,
}

impl RaggedGrid {
    /// Zero-filled grid with the given row lengths
    pub fn zeros(row_lengths: impl IntoIterator<Item = usize>) -> Self {
        let mut offsets = vec![0];
        let mut total = 0;
        for length in row_lengths {
            total += length;
            offsets.push(total);
        }
        Self {
            values: vec![0.0; total],
            offsets,
        }
    }

    /// Zero-filled grid shaped by the duration support of a policy
    pub fn for_policy(grid: &DurationTimeGrid, initial_duration: f64, time_points: usize) -> Self {
        Self::zeros(grid.row_lengths(initial_duration, time_points))
    }

    pub fn rows(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn row(&self, time_index: usize) -> &[f64] {
        &self.values[self.offsets[time_index]..self.offsets[time_index + 1]]
    }

    pub fn row_mut(&mut self, time_index: usize) -> &mut [f64] {
        &mut self.values[self.offsets[time_index]..self.offsets[time_index + 1]]
    }

    pub fn get(&self, time_index: usize, duration_index: usize) -> Option<f64> {
        self.row(time_index).get(duration_index).copied()
    }

    /// Value at the largest duration index of a row, i.e. irrespective of duration
    pub fn at_max_duration(&self, time_index: usize) -> f64 {
        self.row(time_index).last().copied().unwrap_or(0.0)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.offsets.windows(2).map(|w| &self.values[w[0]..w[1]])
    }
}

/// Probability grids of one policy, keyed by state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyProbabilities {
    pub policy_id: String,
    time_points: usize,
    states: BTreeMap<State, RaggedGrid>,
}

impl PolicyProbabilities {
    pub fn new(policy_id: impl Into<String>, time_points: usize, states: BTreeMap<State, RaggedGrid>) -> Self {
        Self {
            policy_id: policy_id.into(),
            time_points,
            states,
        }
    }

    pub fn time_points(&self) -> usize {
        self.time_points
    }

    pub fn state(&self, state: State) -> Option<&RaggedGrid> {
        self.states.get(&state)
    }

    pub fn states(&self) -> impl Iterator<Item = State> + '_ {
        self.states.keys().copied()
    }

    /// Probability of occupying `state` at `time_index`, any duration; zero for untracked states
    pub fn at_max_duration(&self, state: State, time_index: usize) -> f64 {
        self.state(state)
            .map_or(0.0, |grid| grid.at_max_duration(time_index))
    }
}

/// Probabilities of a portfolio, keyed by policy id
pub type ProbabilityTable = BTreeMap<String, PolicyProbabilities>;
