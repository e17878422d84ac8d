//! Policy model: states, payment streams, products and policy loading

mod data;
pub mod loader;
mod product;

pub use data::{Gender, PaymentKey, PaymentStream, Policy, Sign, State, StateCollection};
pub use loader::{load_policies, load_policies_from_reader};
pub use product::{MarketPayment, Product, TechnicalPayment};
