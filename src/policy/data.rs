//! Policy states, payment keys and the static policy record

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use super::product::Product;
use crate::error::{ProjectionError, Result};

/// State occupied by the insured
///
/// The free-policy (paid-up) states mirror the standard ones and are only
/// reached from Active or Disabled through a paid-up conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum State {
    Active,
    Disabled,
    Dead,
    Surrender,
    FreePolicyActive,
    FreePolicyDisabled,
    FreePolicyDead,
    FreePolicySurrender,
}

impl State {
    /// Number of states in the model
    pub const COUNT: usize = 8;

    /// All states in declaration order
    pub const ALL: [State; State::COUNT] = [
        State::Active,
        State::Disabled,
        State::Dead,
        State::Surrender,
        State::FreePolicyActive,
        State::FreePolicyDisabled,
        State::FreePolicyDead,
        State::FreePolicySurrender,
    ];

    /// Ordinal used to index fixed-size state arrays
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_free_policy(self) -> bool {
        matches!(
            self,
            State::FreePolicyActive
                | State::FreePolicyDisabled
                | State::FreePolicyDead
                | State::FreePolicySurrender
        )
    }

    pub fn is_surrender(self) -> bool {
        matches!(self, State::Surrender | State::FreePolicySurrender)
    }

    /// Standard counterpart of a free-policy state; standard states map to themselves
    pub fn standard_equivalent(self) -> State {
        match self {
            State::FreePolicyActive => State::Active,
            State::FreePolicyDisabled => State::Disabled,
            State::FreePolicyDead => State::Dead,
            State::FreePolicySurrender => State::Surrender,
            other => other,
        }
    }

    /// Free-policy counterpart of a standard state; free-policy states map to themselves
    pub fn free_policy_equivalent(self) -> State {
        match self {
            State::Active => State::FreePolicyActive,
            State::Disabled => State::FreePolicyDisabled,
            State::Dead => State::FreePolicyDead,
            State::Surrender => State::FreePolicySurrender,
            other => other,
        }
    }
}

impl FromStr for State {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self> {
        State::ALL
            .iter()
            .copied()
            .find(|state| format!("{:?}", state) == s)
            .ok_or_else(|| ProjectionError::Parse {
                field: "State",
                value: s.to_string(),
            })
    }
}

/// Named groups of states used when summing over parts of the state space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCollection {
    Standard,
    StandardWithSurrender,
    FreePolicyStates,
    FreePolicyStatesWithSurrender,
    /// States from which a paid-up conversion is possible
    RhoModifiedFromStates,
    AllStates,
}

impl StateCollection {
    pub fn states(self) -> &'static [State] {
        match self {
            StateCollection::Standard => &[State::Active, State::Disabled, State::Dead],
            StateCollection::StandardWithSurrender => {
                &[State::Active, State::Disabled, State::Dead, State::Surrender]
            }
            StateCollection::FreePolicyStates => &[
                State::FreePolicyActive,
                State::FreePolicyDisabled,
                State::FreePolicyDead,
            ],
            StateCollection::FreePolicyStatesWithSurrender => &[
                State::FreePolicyActive,
                State::FreePolicyDisabled,
                State::FreePolicyDead,
                State::FreePolicySurrender,
            ],
            StateCollection::RhoModifiedFromStates => &[State::Active, State::Disabled],
            StateCollection::AllStates => &State::ALL,
        }
    }

    pub fn contains(self, state: State) -> bool {
        self.states().contains(&state)
    }
}

/// Gender of the insured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Male" | "M" => Ok(Gender::Male),
            "Female" | "F" => Ok(Gender::Female),
            other => Err(ProjectionError::Parse {
                field: "Gender",
                value: other.to_string(),
            }),
        }
    }
}

/// Origin of a payment: guaranteed at issue or bought with bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PaymentStream {
    Original,
    Bonus,
}

/// Benefits are positive, premiums negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sign {
    Positive,
    Negative,
}

/// Lookup key for payments and reserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaymentKey {
    pub stream: PaymentStream,
    pub sign: Sign,
}

impl PaymentKey {
    pub const ORIGINAL_POSITIVE: PaymentKey = PaymentKey::new(PaymentStream::Original, Sign::Positive);
    pub const ORIGINAL_NEGATIVE: PaymentKey = PaymentKey::new(PaymentStream::Original, Sign::Negative);
    pub const BONUS_POSITIVE: PaymentKey = PaymentKey::new(PaymentStream::Bonus, Sign::Positive);
    pub const BONUS_NEGATIVE: PaymentKey = PaymentKey::new(PaymentStream::Bonus, Sign::Negative);

    pub const fn new(stream: PaymentStream, sign: Sign) -> Self {
        Self { stream, sign }
    }
}

impl fmt::Display for PaymentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.stream, self.sign)
    }
}

// Serialized as "Stream/Sign" so reserve tables can be written as JSON maps
impl Serialize for PaymentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single insurance contract
///
/// Immutable once constructed; the payment products are keyed by stream and sign.
#[derive(Debug, Clone)]
pub struct Policy {
    pub policy_id: String,

    /// Age at the valuation date (years)
    pub age: f64,

    pub gender: Gender,

    /// Age at which all cover ends (years)
    pub expiry_age: f64,

    pub initial_state: State,

    /// Time already spent in the initial state (years)
    pub initial_duration: f64,

    /// Calendar time at which the projection starts (years)
    pub initial_time: f64,

    payments: BTreeMap<PaymentKey, Product>,
}

impl Policy {
    /// Create a policy without any payments attached
    pub fn new(
        policy_id: impl Into<String>,
        age: f64,
        gender: Gender,
        expiry_age: f64,
        initial_state: State,
        initial_duration: f64,
        initial_time: f64,
    ) -> Result<Self> {
        let policy_id = policy_id.into();
        let invalid = |reason: String| ProjectionError::InvalidPolicy {
            policy_id: policy_id.clone(),
            reason,
        };

        if !(age.is_finite() && expiry_age.is_finite()) {
            return Err(invalid(format!("age {} and expiry age {} must be finite", age, expiry_age)));
        }
        if age > expiry_age {
            return Err(invalid(format!("age {} exceeds expiry age {}", age, expiry_age)));
        }
        if !(initial_duration >= 0.0 && initial_duration.is_finite()) {
            return Err(invalid(format!("initial duration {} must be non-negative", initial_duration)));
        }
        if !(initial_time >= 0.0 && initial_time.is_finite()) {
            return Err(invalid(format!("initial time {} must be non-negative", initial_time)));
        }

        Ok(Self {
            policy_id,
            age,
            gender,
            expiry_age,
            initial_state,
            initial_duration,
            initial_time,
            payments: BTreeMap::new(),
        })
    }

    /// Attach a product to a payment stream and sign, replacing any previous one
    pub fn with_payment(mut self, stream: PaymentStream, sign: Sign, product: Product) -> Self {
        self.payments.insert(PaymentKey::new(stream, sign), product);
        self
    }

    pub fn payment(&self, key: PaymentKey) -> Option<&Product> {
        self.payments.get(&key)
    }

    /// Attached products in key order (Original before Bonus, Positive before Negative)
    pub fn payments(&self) -> impl Iterator<Item = (PaymentKey, &Product)> {
        self.payments.iter().map(|(key, product)| (*key, product))
    }

    /// Attained age at a given time since the projection start
    pub fn attained_age(&self, time: f64) -> f64 {
        self.age + self.initial_time + time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_equivalents() {
        for state in State::ALL {
            assert_eq!(state.free_policy_equivalent().standard_equivalent(), state.standard_equivalent());
            assert!(state.free_policy_equivalent().is_free_policy());
            assert!(!state.standard_equivalent().is_free_policy());
        }
        assert_eq!(State::Disabled.free_policy_equivalent(), State::FreePolicyDisabled);
        assert_eq!(State::FreePolicySurrender.standard_equivalent(), State::Surrender);
    }

    #[test]
    fn test_state_index_matches_declaration_order() {
        for (i, state) in State::ALL.iter().enumerate() {
            assert_eq!(state.index(), i);
        }
    }

    #[test]
    fn test_state_collections() {
        assert_eq!(StateCollection::AllStates.states().len(), State::COUNT);
        assert!(StateCollection::StandardWithSurrender.contains(State::Surrender));
        assert!(!StateCollection::Standard.contains(State::Surrender));
        assert!(StateCollection::FreePolicyStates
            .states()
            .iter()
            .all(|s| s.is_free_policy() && !s.is_surrender()));
        assert_eq!(
            StateCollection::RhoModifiedFromStates.states(),
            &[State::Active, State::Disabled]
        );
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("FreePolicyActive".parse::<State>().unwrap(), State::FreePolicyActive);
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert!("Retired".parse::<State>().is_err());
        assert!("X".parse::<Gender>().is_err());
    }

    #[test]
    fn test_payment_key_serializes_as_string() {
        let json = serde_json::to_string(&PaymentKey::ORIGINAL_NEGATIVE).unwrap();
        assert_eq!(json, "\"Original/Negative\"");
    }

    #[test]
    fn test_policy_rejects_age_above_expiry() {
        let result = Policy::new("p", 91.0, Gender::Male, 90.0, State::Active, 0.0, 0.0);
        assert!(matches!(result, Err(ProjectionError::InvalidPolicy { .. })));
    }

    #[test]
    fn test_policy_rejects_negative_duration() {
        let result = Policy::new("p", 30.0, Gender::Male, 90.0, State::Active, -1.0, 0.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_policy_payments_ordered() {
        let policy = Policy::new("p", 30.0, Gender::Female, 90.0, State::Disabled, 1.0, 0.0)
            .unwrap()
            .with_payment(PaymentStream::Bonus, Sign::Positive, Product::default())
            .with_payment(PaymentStream::Original, Sign::Negative, Product::default())
            .with_payment(PaymentStream::Original, Sign::Positive, Product::default());

        let keys: Vec<PaymentKey> = policy.payments().map(|(key, _)| key).collect();
        assert_eq!(
            keys,
            vec![
                PaymentKey::ORIGINAL_POSITIVE,
                PaymentKey::ORIGINAL_NEGATIVE,
                PaymentKey::BONUS_POSITIVE
            ]
        );
        assert!(policy.payment(PaymentKey::BONUS_NEGATIVE).is_none());
        assert!((policy.attained_age(2.5) - 32.5).abs() < 1e-12);
    }
}
