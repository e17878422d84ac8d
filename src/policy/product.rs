//! Payment functions of an insurance product on the technical and market basis

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::data::State;

/// Continuous payment rate or jump payment on the technical basis, as a function of attained age
pub type TechnicalPayment = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Payment on the market basis, as a function of attained age and duration in the current state
pub type MarketPayment = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// Per-state continuous payments and per-transition jump payments
///
/// Products are immutable once built and cheap to clone; the closures are shared.
#[derive(Clone, Default)]
pub struct Product {
    technical_payments: BTreeMap<State, TechnicalPayment>,
    technical_jumps: BTreeMap<(State, State), TechnicalPayment>,
    market_payments: BTreeMap<State, MarketPayment>,
    market_jumps: BTreeMap<(State, State), MarketPayment>,
}

impl Product {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_technical_payment<F>(mut self, state: State, payment: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.technical_payments.insert(state, Arc::new(payment));
        self
    }

    pub fn with_technical_jump<F>(mut self, from: State, to: State, payment: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.technical_jumps.insert((from, to), Arc::new(payment));
        self
    }

    pub fn with_market_payment<F>(mut self, state: State, payment: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.market_payments.insert(state, Arc::new(payment));
        self
    }

    pub fn with_market_jump<F>(mut self, from: State, to: State, payment: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.market_jumps.insert((from, to), Arc::new(payment));
        self
    }

    pub fn technical_payment(&self, state: State) -> Option<&TechnicalPayment> {
        self.technical_payments.get(&state)
    }

    pub fn technical_jump(&self, from: State, to: State) -> Option<&TechnicalPayment> {
        self.technical_jumps.get(&(from, to))
    }

    pub fn market_payment(&self, state: State) -> Option<&MarketPayment> {
        self.market_payments.get(&state)
    }

    pub fn market_jump(&self, from: State, to: State) -> Option<&MarketPayment> {
        self.market_jumps.get(&(from, to))
    }

    /// Compose products by pointwise summation per state and per transition
    ///
    /// Terms are added in the order the products are given.
    pub fn sum(products: &[Product]) -> Product {
        Product {
            technical_payments: sum_by_key(products.iter().map(|p| &p.technical_payments), sum_technical),
            technical_jumps: sum_by_key(products.iter().map(|p| &p.technical_jumps), sum_technical),
            market_payments: sum_by_key(products.iter().map(|p| &p.market_payments), sum_market),
            market_jumps: sum_by_key(products.iter().map(|p| &p.market_jumps), sum_market),
        }
    }
}

/// Group the payments of all maps by key and combine each group into one payment
fn sum_by_key<'a, K, F>(
    maps: impl Iterator<Item = &'a BTreeMap<K, Arc<F>>>,
    combine: fn(Vec<Arc<F>>) -> Arc<F>,
) -> BTreeMap<K, Arc<F>>
where
    K: Ord + Copy + 'a,
    F: ?Sized + 'a,
{
    let mut grouped: BTreeMap<K, Vec<Arc<F>>> = BTreeMap::new();
    for map in maps {
        for (key, payment) in map {
            grouped.entry(*key).or_default().push(Arc::clone(payment));
        }
    }
    grouped
        .into_iter()
        .map(|(key, terms)| (key, combine(terms)))
        .collect()
}

fn sum_technical(terms: Vec<TechnicalPayment>) -> TechnicalPayment {
    Arc::new(move |age: f64| terms.iter().fold(0.0, |acc, term| acc + term(age)))
}

fn sum_market(terms: Vec<MarketPayment>) -> MarketPayment {
    Arc::new(move |age: f64, duration: f64| {
        terms.iter().fold(0.0, |acc, term| acc + term(age, duration))
    })
}

impl fmt::Debug for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Product")
            .field("technical_payments", &self.technical_payments.keys().collect::<Vec<_>>())
            .field("technical_jumps", &self.technical_jumps.keys().collect::<Vec<_>>())
            .field("market_payments", &self.market_payments.keys().collect::<Vec<_>>())
            .field("market_jumps", &self.market_jumps.keys().collect::<Vec<_>>())
            .finish()
    }
}
