//! Transition intensity tables
//!
//! Rates are stored in a fixed 8x8 array indexed by state ordinal. Unregistered
//! transitions are `None` and contribute a zero rate. The diagonal entry holds
//! the total outflow rate of a state, derived once from the registered
//! off-diagonal entries when the table is built.

use std::fmt;
use std::sync::Arc;

use crate::policy::{Gender, State};

/// Transition rate as a function of attained age and duration in the current state
pub type IntensityFn = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// Registered transition rates for one gender
#[derive(Clone, Default)]
pub struct IntensityTable {
    rates: [[Option<IntensityFn>; State::COUNT]; State::COUNT],
}

impl IntensityTable {
    pub fn builder() -> IntensityTableBuilder {
        IntensityTableBuilder::default()
    }

    /// Rate function for `from -> to`; `from == to` gives the total outflow
    pub fn get(&self, from: State, to: State) -> Option<&IntensityFn> {
        self.rates[from.index()][to.index()].as_ref()
    }

    pub fn has_transition(&self, from: State, to: State) -> bool {
        from != to && self.get(from, to).is_some()
    }

    /// Rate of `from -> to`, zero when no transition is registered
    pub fn rate(&self, from: State, to: State, age: f64, duration: f64) -> f64 {
        self.get(from, to).map_or(0.0, |f| f(age, duration))
    }

    /// Sum of all registered outflow rates of `state`
    pub fn total_outflow(&self, state: State, age: f64, duration: f64) -> f64 {
        self.rate(state, state, age, duration)
    }

    /// Registered off-diagonal transitions out of `from`, in state order
    pub fn transitions_from(&self, from: State) -> impl Iterator<Item = (State, &IntensityFn)> + '_ {
        State::ALL
            .into_iter()
            .filter(move |&to| to != from)
            .filter_map(move |to| self.get(from, to).map(|f| (to, f)))
    }

    /// States appearing in at least one registered transition, in state order
    pub fn states(&self) -> Vec<State> {
        State::ALL
            .into_iter()
            .filter(|&state| {
                State::ALL
                    .into_iter()
                    .any(|other| self.has_transition(state, other) || self.has_transition(other, state))
            })
            .collect()
    }
}

impl fmt::Debug for IntensityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transitions: Vec<(State, State)> = State::ALL
            .into_iter()
            .flat_map(|from| self.transitions_from(from).map(move |(to, _)| (from, to)))
            .collect();
        f.debug_struct("IntensityTable")
            .field("transitions", &transitions)
            .finish()
    }
}

/// Collects off-diagonal transitions and derives the diagonal on `build`
#[derive(Default)]
pub struct IntensityTableBuilder {
    transitions: Vec<(State, State, IntensityFn)>,
}

impl IntensityTableBuilder {
    /// Register the rate of `from -> to`; a later registration of the same pair replaces it
    pub fn transition<F>(mut self, from: State, to: State, rate: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.transitions.push((from, to, Arc::new(rate)));
        self
    }

    pub fn build(self) -> IntensityTable {
        let mut table = IntensityTable::default();

        for (from, to, rate) in self.transitions {
            if from == to {
                log::warn!("Ignoring explicit diagonal intensity for {:?}; it is derived from the outflows", from);
                continue;
            }
            table.rates[from.index()][to.index()] = Some(rate);
        }

        for state in State::ALL {
            let outflows: Vec<IntensityFn> = table
                .transitions_from(state)
                .map(|(_, rate)| Arc::clone(rate))
                .collect();
            if outflows.is_empty() {
                continue;
            }
            let total: IntensityFn = Arc::new(move |age, duration| {
                outflows.iter().fold(0.0, |acc, rate| acc + rate(age, duration))
            });
            table.rates[state.index()][state.index()] = Some(total);
        }

        table
    }
}

/// Gender-keyed intensity tables
#[derive(Debug, Clone)]
pub struct IntensityModel {
    male: IntensityTable,
    female: IntensityTable,
}

impl IntensityModel {
    pub fn new(male: IntensityTable, female: IntensityTable) -> Self {
        Self { male, female }
    }

    /// Same table for both genders
    pub fn unisex(table: IntensityTable) -> Self {
        Self {
            male: table.clone(),
            female: table,
        }
    }

    pub fn for_gender(&self, gender: Gender) -> &IntensityTable {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }

    /// States used by any gender, in state order
    pub fn state_space(&self) -> Vec<State> {
        let male = self.male.states();
        let female = self.female.states();
        State::ALL
            .into_iter()
            .filter(|state| male.contains(state) || female.contains(state))
            .collect()
    }
}
