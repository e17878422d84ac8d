//! Standard market and technical intensity bases
//!
//! Market basis: gender-specific best-estimate rates for disability, mortality,
//! surrender, paid-up conversion and reactivation, with the free-policy states
//! mirroring the standard ones. Technical basis: unisex, duration-independent
//! rates for disability and mortality together with the technical interest rate.

use super::intensity::{IntensityModel, IntensityTable};
use crate::policy::{Gender, State};

/// Age at which annuities start and premiums stop
pub const PENSION_AGE: f64 = 67.0;

/// Annual technical interest rate
pub const TECHNICAL_INTEREST_RATE: f64 = 0.02;

/// Surrender is only possible up to this age
const SURRENDER_END_AGE: f64 = 60.0;

/// Duration (years) at which reactivation and disabled mortality switch formula
const DISABILITY_SELECT_PERIOD: f64 = 2.0;

/// 1.0 when `x <= y`, else 0.0
pub fn less_than_indicator(x: f64, y: f64) -> f64 {
    if x <= y {
        1.0
    } else {
        0.0
    }
}

/// 1.0 when `x >= y`, else 0.0
pub fn greater_than_indicator(x: f64, y: f64) -> f64 {
    if x >= y {
        1.0
    } else {
        0.0
    }
}

/// Technical intensities and interest used for reserving
#[derive(Debug, Clone)]
pub struct TechnicalBasis {
    pub intensities: IntensityTable,
    pub interest_rate: f64,
}

impl TechnicalBasis {
    pub fn new(intensities: IntensityTable, interest_rate: f64) -> Self {
        Self {
            intensities,
            interest_rate,
        }
    }

    /// Unisex disability and mortality rates at 2% technical interest
    pub fn standard() -> Self {
        let intensities = IntensityTable::builder()
            .transition(State::Active, State::Disabled, |age, _| {
                0.0004 + 10f64.powf(5.26 + 0.048 * age - 10.0)
            })
            .transition(State::Active, State::Dead, |age, _| technical_mortality(age))
            .transition(State::Disabled, State::Dead, |age, _| technical_mortality(age))
            .build();
        Self::new(intensities, TECHNICAL_INTEREST_RATE)
    }
}

fn technical_mortality(age: f64) -> f64 {
    0.0006 + 10f64.powf(5.6 + 0.04 * age - 10.0)
}

/// Best-estimate market basis for both genders
pub fn market_basis() -> IntensityModel {
    IntensityModel::new(market_table(Gender::Male), market_table(Gender::Female))
}

fn market_table(gender: Gender) -> IntensityTable {
    let disability = move |age: f64, _: f64| disability_rate(gender, age);
    let mortality = move |age: f64, _: f64| active_mortality(gender, age);
    let reactivation = move |age: f64, duration: f64| reactivation_rate(gender, age, duration);
    let disabled_mortality = move |age: f64, duration: f64| disabled_mortality(gender, age, duration);

    IntensityTable::builder()
        .transition(State::Active, State::Disabled, disability)
        .transition(State::Active, State::Dead, mortality)
        .transition(State::Active, State::Surrender, |age, _| surrender_rate(age))
        .transition(State::Active, State::FreePolicyActive, |age, _| free_policy_rate(age))
        .transition(State::Disabled, State::Active, reactivation)
        .transition(State::Disabled, State::Dead, disabled_mortality)
        .transition(State::FreePolicyActive, State::FreePolicyDisabled, disability)
        .transition(State::FreePolicyActive, State::FreePolicyDead, mortality)
        .transition(State::FreePolicyActive, State::FreePolicySurrender, |age, _| surrender_rate(age))
        .transition(State::FreePolicyDisabled, State::FreePolicyActive, reactivation)
        .transition(State::FreePolicyDisabled, State::FreePolicyDead, disabled_mortality)
        .build()
}

fn disability_rate(gender: Gender, age: f64) -> f64 {
    match gender {
        Gender::Male => (0.000075 + 10f64.powf(0.0386 * age + 5.371456 - 10.0)).max(1e-4),
        Gender::Female => (-0.000908 + 10f64.powf(0.026539 * age + 6.591359 - 10.0)).max(1e-4),
    }
}

fn active_mortality(gender: Gender, age: f64) -> f64 {
    match gender {
        Gender::Male => 0.000069 + 10f64.powf(0.049553 * age + 4.776691 - 10.0),
        Gender::Female => 0.000049 + 10f64.powf(0.049055 * age + 4.667086 - 10.0),
    }
}

fn surrender_rate(age: f64) -> f64 {
    (0.0522 - 0.0011 * (age - 30.0).max(0.0)) * less_than_indicator(age, SURRENDER_END_AGE)
}

fn free_policy_rate(age: f64) -> f64 {
    0.08 * less_than_indicator(age, PENSION_AGE)
}

fn reactivation_rate(gender: Gender, age: f64, duration: f64) -> f64 {
    let select = duration <= DISABILITY_SELECT_PERIOD;
    match (gender, select) {
        (Gender::Male, true) => (0.485408 - 0.006058 * age.max(24.0)).max(0.0),
        (Gender::Male, false) => (0.103816 - 0.001861 * age.max(29.0)).max(0.0),
        (Gender::Female, true) => (0.751028 - 0.010992 * age.max(24.0)).max(0.0),
        (Gender::Female, false) => (0.155466 - 0.00303 * age.max(29.0)).max(0.0),
    }
}

fn disabled_mortality(gender: Gender, age: f64, duration: f64) -> f64 {
    let select = duration <= DISABILITY_SELECT_PERIOD;
    match (gender, select) {
        (Gender::Male, true) => 0.019292 + 10f64.powf(0.047961 * age + 6.030109 - 10.0),
        (Gender::Male, false) => 0.010339 + 10f64.powf(0.05049 * age + 5.070927 - 10.0),
        (Gender::Female, true) => -0.182547 + 10f64.powf(0.00345 * age + 9.166944 - 10.0),
        (Gender::Female, false) => 0.005539 + 10f64.powf(0.076478 * age + 3.266007 - 10.0),
    }
}
