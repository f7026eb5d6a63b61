//! Generating units available for commitment.
use crate::input::check_non_negative;
use crate::units::{Money, MoneyPerEnergy, Power};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// A generating unit.
///
/// Units are identified by their position in the fleet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Generator {
    /// Cost incurred for every hour in which the unit is committed
    pub fixed_cost: Money,
    /// Cost per MWh produced
    pub marginal_cost: MoneyPerEnergy,
    /// Maximum power output, shared between production and spinning reserve
    pub max_power: Power,
    /// Cost incurred when the unit is switched on
    pub startup_cost: Money,
    /// Cost incurred when the unit is switched off
    pub shutdown_cost: Money,
}

impl Generator {
    /// Check that all costs and the capacity are finite and non-negative
    pub fn validate(&self) -> Result<()> {
        check_non_negative(self.fixed_cost, "fixed_cost")?;
        check_non_negative(self.marginal_cost, "marginal_cost")?;
        check_non_negative(self.max_power, "max_power")?;
        check_non_negative(self.startup_cost, "startup_cost")?;
        check_non_negative(self.shutdown_cost, "shutdown_cost")?;

        Ok(())
    }
}

/// Check the fleet of generators is valid
pub fn check_generators(generators: &[Generator]) -> Result<()> {
    ensure!(!generators.is_empty(), "No generators provided");

    for (index, generator) in generators.iter().enumerate() {
        generator
            .validate()
            .with_context(|| format!("Invalid data for generator {index}"))?;
    }

    Ok(())
}
