//! Read and validate model parameters.
//!
//! These are the scalar settings of the unit commitment problem, given in the `[parameters]` table
//! of `model.toml`. Every parameter has a default.
use crate::horizon::Horizon;
use crate::input::check_proportion;
use crate::units::Dimensionless;
use anyhow::{Result, ensure};
use log::warn;
use serde::Deserialize;

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_horizon_hours, usize, 24);
define_unit_param_default!(default_reserve_fraction, Dimensionless, 0.1);
define_unit_param_default!(default_reserve_price_factor, Dimensionless, 0.5);
define_param_default!(default_require_stop_within_horizon, bool, true);

/// Scalar parameters for the unit commitment problem
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelParameters {
    /// Number of hours in the horizon
    #[serde(default = "default_horizon_hours")]
    pub horizon_hours: usize,
    /// Spinning reserve required in each hour, as a proportion of the load forecast
    #[serde(default = "default_reserve_fraction")]
    pub reserve_fraction: Dimensionless,
    /// Price of spinning reserve as a proportion of a unit's marginal cost.
    ///
    /// Reserve is not always dispatched, so it is priced below energy.
    #[serde(default = "default_reserve_price_factor")]
    pub reserve_price_factor: Dimensionless,
    /// Whether a demand-response activation must register its stop within the horizon.
    ///
    /// If false, an activation whose stop would fall after the last hour may run until the end of
    /// the horizon.
    #[serde(default = "default_require_stop_within_horizon")]
    pub require_stop_within_horizon: bool,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            horizon_hours: default_horizon_hours(),
            reserve_fraction: default_reserve_fraction(),
            reserve_price_factor: default_reserve_price_factor(),
            require_stop_within_horizon: default_require_stop_within_horizon(),
        }
    }
}

/// Check that the `horizon_hours` parameter is valid
fn check_horizon_hours(value: usize) -> Result<()> {
    ensure!(value > 0, "horizon_hours cannot be zero");

    Ok(())
}

/// Check that the `reserve_price_factor` parameter is valid
fn check_reserve_price_factor(value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Dimensionless(0.0),
        "reserve_price_factor must be a finite number greater than or equal to zero"
    );

    Ok(())
}

impl ModelParameters {
    /// The horizon over which units are committed
    pub fn horizon(&self) -> Horizon {
        Horizon::new(self.horizon_hours)
    }

    /// Validate parameters after reading them in
    pub fn validate(&self) -> Result<()> {
        // horizon_hours
        check_horizon_hours(self.horizon_hours)?;

        // reserve_fraction
        check_proportion(self.reserve_fraction, "reserve_fraction")?;
        if self.reserve_fraction == Dimensionless(0.0) {
            warn!("reserve_fraction is zero, so no spinning reserve will be required");
        }

        // reserve_price_factor
        check_reserve_price_factor(self.reserve_price_factor)?;

        Ok(())
    }
}
