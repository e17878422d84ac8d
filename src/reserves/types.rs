//! Reserve tables and the views used by the cash-flow calculations

use std::collections::BTreeMap;

use serde::Serialize;

use crate::policy::{PaymentKey, State};

/// Technical reserves of one policy, per payment key and state, over the time index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyReserves {
    pub policy_id: String,
    time_points: usize,
    reserves: BTreeMap<PaymentKey, BTreeMap<State, Vec<f64>>>,
}

impl PolicyReserves {
    pub fn new(
        policy_id: impl Into<String>,
        time_points: usize,
        reserves: BTreeMap<PaymentKey, BTreeMap<State, Vec<f64>>>,
    ) -> Self {
        Self {
            policy_id: policy_id.into(),
            time_points,
            reserves,
        }
    }

    pub fn time_points(&self) -> usize {
        self.time_points
    }

    /// Reserve series of one payment key and state
    pub fn get(&self, key: PaymentKey, state: State) -> Option<&[f64]> {
        self.reserves
            .get(&key)
            .and_then(|states| states.get(&state))
            .map(Vec::as_slice)
    }

    /// Reserve at a time index; zero when the policy has no such product or state
    pub fn value(&self, key: PaymentKey, state: State, time_index: usize) -> f64 {
        self.get(key, state)
            .and_then(|series| series.get(time_index))
            .copied()
            .unwrap_or(0.0)
    }

    /// Original benefits and premiums combined
    pub fn original(&self, state: State, time_index: usize) -> f64 {
        self.value(PaymentKey::ORIGINAL_POSITIVE, state, time_index)
            + self.value(PaymentKey::ORIGINAL_NEGATIVE, state, time_index)
    }

    /// Original benefits only; the reserve of a paid-up policy
    pub fn original_positive(&self, state: State, time_index: usize) -> f64 {
        self.value(PaymentKey::ORIGINAL_POSITIVE, state, time_index)
    }

    pub fn bonus(&self, state: State, time_index: usize) -> f64 {
        self.value(PaymentKey::BONUS_POSITIVE, state, time_index)
            + self.value(PaymentKey::BONUS_NEGATIVE, state, time_index)
    }

    /// Ratio of net to gross Active reserve per time index
    ///
    /// `(V+ + V-) / V+`, or 1.0 where the gross reserve is exactly zero.
    pub fn free_policy_factor(&self) -> Vec<f64> {
        (0..self.time_points)
            .map(|i| {
                let gross = self.value(PaymentKey::ORIGINAL_POSITIVE, State::Active, i);
                if gross == 0.0 {
                    log::trace!("Policy {}: zero gross reserve at index {}, factor 1", self.policy_id, i);
                    return 1.0;
                }
                (gross + self.value(PaymentKey::ORIGINAL_NEGATIVE, State::Active, i)) / gross
            })
            .collect()
    }
}

/// Reserves of a portfolio, keyed by policy id
pub type ReserveTable = BTreeMap<String, PolicyReserves>;

#[cfg(test)]
mod tests {
    use super::*;

    fn reserves() -> PolicyReserves {
        let mut positive = BTreeMap::new();
        positive.insert(State::Active, vec![100.0, 50.0, 0.0]);
        positive.insert(State::Disabled, vec![200.0, 100.0, 0.0]);
        let mut negative = BTreeMap::new();
        negative.insert(State::Active, vec![-40.0, -10.0, 0.0]);
        let mut bonus = BTreeMap::new();
        bonus.insert(State::Active, vec![7.0, 3.0, 0.0]);

        let mut table = BTreeMap::new();
        table.insert(PaymentKey::ORIGINAL_POSITIVE, positive);
        table.insert(PaymentKey::ORIGINAL_NEGATIVE, negative);
        table.insert(PaymentKey::BONUS_POSITIVE, bonus);
        PolicyReserves::new("p", 3, table)
    }

    #[test]
    fn test_views() {
        let reserves = reserves();
        assert!((reserves.original(State::Active, 0) - 60.0).abs() < 1e-12);
        assert!((reserves.original(State::Disabled, 1) - 100.0).abs() < 1e-12);
        assert!((reserves.original_positive(State::Active, 0) - 100.0).abs() < 1e-12);
        assert!((reserves.bonus(State::Active, 1) - 3.0).abs() < 1e-12);
        assert_eq!(reserves.bonus(State::Disabled, 1), 0.0);
        assert_eq!(reserves.value(PaymentKey::ORIGINAL_POSITIVE, State::Active, 10), 0.0);
        assert!(reserves.get(PaymentKey::BONUS_NEGATIVE, State::Active).is_none());
    }

    #[test]
    fn test_free_policy_factor_with_zero_guard() {
        let factor = reserves().free_policy_factor();
        assert_eq!(factor.len(), 3);
        assert!((factor[0] - 0.6).abs() < 1e-12);
        assert!((factor[1] - 0.8).abs() < 1e-12);
        assert_eq!(factor[2], 1.0);
    }

    #[test]
    fn test_serializes_payment_keys_as_strings() {
        let json = serde_json::to_string(&reserves()).unwrap();
        assert!(json.contains("\"Original/Positive\""));
        assert!(json.contains("\"Active\""));
    }
}
