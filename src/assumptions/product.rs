//! Standard product catalogue and the example policy
//!
//! Benefits are positive amounts, premiums are passed as negative amounts.

use super::basis::{greater_than_indicator, less_than_indicator, PENSION_AGE};
use crate::error::Result;
use crate::policy::{Gender, PaymentStream, Policy, Product, Sign, State};

/// Waiting period (years) before a market disability annuity starts paying
const DISABILITY_DEFERMENT: f64 = 1.0;

/// Annuity paid from pension age while alive (Active or Disabled)
pub fn life_annuity(amount: f64) -> Product {
    let technical = move |age: f64| greater_than_indicator(age, PENSION_AGE) * amount;
    let market = move |age: f64, _duration: f64| technical(age);

    Product::new()
        .with_technical_payment(State::Active, technical)
        .with_technical_payment(State::Disabled, technical)
        .with_market_payment(State::Active, market)
        .with_market_payment(State::Disabled, market)
}

/// Premium paid until pension age in Active and Disabled
pub fn premium(amount: f64) -> Product {
    let technical = move |age: f64| less_than_indicator(age, PENSION_AGE) * amount;
    let market = move |age: f64, _duration: f64| technical(age);

    Product::new()
        .with_technical_payment(State::Active, technical)
        .with_technical_payment(State::Disabled, technical)
        .with_market_payment(State::Active, market)
        .with_market_payment(State::Disabled, market)
}

/// Disability annuity paid until pension age
///
/// The technical basis has no duration, so the annuity pays from entering Disabled.
/// On the market basis it pays once the disability has lasted one year.
pub fn deferred_disability_annuity(amount: f64) -> Product {
    Product::new()
        .with_technical_payment(State::Disabled, move |age| {
            less_than_indicator(age, PENSION_AGE) * amount
        })
        .with_market_payment(State::Disabled, move |age, duration| {
            less_than_indicator(age, PENSION_AGE)
                * greater_than_indicator(duration, DISABILITY_DEFERMENT)
                * amount
        })
}

/// Annual amounts of the standard products held by a policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductAmounts {
    pub life_annuity: f64,
    pub disability_annuity: f64,
    /// Premium rate as a positive amount
    pub premium: f64,
}

/// Attach the standard products to a policy
///
/// Original benefits are the life annuity plus the deferred disability annuity,
/// the original premium is charged negatively, and the bonus stream holds a life
/// annuity of the same amount as the original one.
pub fn attach_standard_products(policy: Policy, amounts: &ProductAmounts) -> Policy {
    let benefits = Product::sum(&[
        life_annuity(amounts.life_annuity),
        deferred_disability_annuity(amounts.disability_annuity),
    ]);

    policy
        .with_payment(PaymentStream::Original, Sign::Positive, benefits)
        .with_payment(PaymentStream::Original, Sign::Negative, premium(-amounts.premium))
        .with_payment(PaymentStream::Bonus, Sign::Positive, life_annuity(amounts.life_annuity))
}

/// Male aged 30, active for 5 years, expiry 90, with the standard products
pub fn standard_policy() -> Result<Policy> {
    let policy = Policy::new("policy1", 30.0, Gender::Male, 90.0, State::Active, 5.0, 0.0)?;
    let amounts = ProductAmounts {
        life_annuity: 1000.0,
        disability_annuity: 500.0,
        premium: 200.0,
    };
    Ok(attach_standard_products(policy, &amounts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PaymentKey;

    #[test]
    fn test_life_annuity_starts_at_pension_age() {
        let product = life_annuity(1000.0);
        let technical = product.technical_payment(State::Active).unwrap();
        let market = product.market_payment(State::Disabled).unwrap();
        assert_eq!(technical(66.9), 0.0);
        assert_eq!(technical(67.0), 1000.0);
        assert_eq!(market(70.0, 0.0), 1000.0);
        assert!(product.technical_payment(State::Dead).is_none());
    }

    #[test]
    fn test_premium_stops_at_pension_age() {
        let product = premium(-200.0);
        let technical = product.technical_payment(State::Active).unwrap();
        assert_eq!(technical(30.0), -200.0);
        assert_eq!(technical(67.5), 0.0);
    }

    #[test]
    fn test_disability_annuity_deferment_on_market_basis() {
        let product = deferred_disability_annuity(500.0);
        let technical = product.technical_payment(State::Disabled).unwrap();
        let market = product.market_payment(State::Disabled).unwrap();
        assert_eq!(technical(40.0), 500.0);
        assert_eq!(market(40.0, 0.5), 0.0);
        assert_eq!(market(40.0, 1.0), 500.0);
        assert_eq!(market(68.0, 3.0), 0.0);
        assert!(product.market_payment(State::Active).is_none());
    }

    #[test]
    fn test_standard_policy() {
        let policy = standard_policy().unwrap();
        assert_eq!(policy.policy_id, "policy1");
        assert_eq!(policy.initial_state, State::Active);

        let benefits = policy.payment(PaymentKey::ORIGINAL_POSITIVE).unwrap();
        let disabled = benefits.technical_payment(State::Disabled).unwrap();
        assert_eq!(disabled(40.0), 500.0);
        assert_eq!(disabled(70.0), 1000.0);

        let bonus = policy.payment(PaymentKey::BONUS_POSITIVE).unwrap();
        assert_eq!(bonus.market_payment(State::Active).unwrap()(70.0, 0.0), 1000.0);
        assert!(policy.payment(PaymentKey::BONUS_NEGATIVE).is_none());
    }
}
