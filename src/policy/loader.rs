//! Load policies from a policy CSV file
//!
//! Each row carries the static policy attributes plus the amounts of the
//! standard products (life annuity, deferred disability annuity, premium).

use std::io::Read;
use std::path::Path;

use csv::Reader;

use super::{Gender, Policy, State};
use crate::assumptions::product::{attach_standard_products, ProductAmounts};
use crate::error::Result;

/// Raw CSV row matching the policy file columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "PolicyID")]
    policy_id: String,
    #[serde(rename = "Age")]
    age: f64,
    #[serde(rename = "Gender")]
    gender: String,
    #[serde(rename = "ExpiryAge")]
    expiry_age: f64,
    #[serde(rename = "InitialState")]
    initial_state: String,
    #[serde(rename = "InitialDuration")]
    initial_duration: f64,
    #[serde(rename = "InitialTime")]
    initial_time: f64,
    #[serde(rename = "LifeAnnuity")]
    life_annuity: f64,
    #[serde(rename = "DisabilityAnnuity")]
    disability_annuity: f64,
    #[serde(rename = "Premium")]
    premium: f64,
}

impl CsvRow {
    fn into_policy(self) -> Result<Policy> {
        let gender: Gender = self.gender.trim().parse()?;
        let initial_state: State = self.initial_state.trim().parse()?;

        let policy = Policy::new(
            self.policy_id,
            self.age,
            gender,
            self.expiry_age,
            initial_state,
            self.initial_duration,
            self.initial_time,
        )?;

        let amounts = ProductAmounts {
            life_annuity: self.life_annuity,
            disability_annuity: self.disability_annuity,
            premium: self.premium,
        };

        Ok(attach_standard_products(policy, &amounts))
    }
}

/// Load policies from a CSV file
pub fn load_policies<P: AsRef<Path>>(path: P) -> Result<Vec<Policy>> {
    let file = std::fs::File::open(path)?;
    load_policies_from_reader(file)
}

/// Load policies from any reader (e.g., string buffer, network stream)
pub fn load_policies_from_reader<R: Read>(reader: R) -> Result<Vec<Policy>> {
    let mut rdr = Reader::from_reader(reader);
    let mut policies = Vec::new();

    for result in rdr.deserialize() {
        let row: CsvRow = result?;
        policies.push(row.into_policy()?);
    }

    log::debug!("Loaded {} policies", policies.len());
    Ok(policies)
}
