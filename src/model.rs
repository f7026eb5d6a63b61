//! The model represents the static input data provided by the user.
use crate::aggregator::{Aggregator, Offer, OfferID, check_aggregators, iter_offers};
use crate::generator::{Generator, check_generators};
use crate::horizon::{Horizon, Hour};
use crate::input::{check_non_negative, input_err_msg, read_toml};
use crate::units::{Money, MoneyPerEnergy, Power};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

pub mod parameters;
pub use parameters::ModelParameters;

const MODEL_FILE_NAME: &str = "model.toml";

/// Model definition
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Model {
    /// Scalar model parameters
    #[serde(default)]
    pub parameters: ModelParameters,
    /// The fleet of generating units
    pub generators: Vec<Generator>,
    /// Forecast load for every hour of the horizon
    pub load: Vec<Power>,
    /// Demand-response aggregators (only used when demand response is enabled)
    #[serde(default)]
    pub aggregators: Vec<Aggregator>,
}

impl Model {
    /// Create a new [`Model`], checking that the data are valid
    pub fn new(
        parameters: ModelParameters,
        generators: Vec<Generator>,
        load: Vec<Power>,
        aggregators: Vec<Aggregator>,
    ) -> Result<Self> {
        let model = Self {
            parameters,
            generators,
            load,
            aggregators,
        };
        model.validate()?;

        Ok(model)
    }

    /// Parse and validate a model from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let model: Model = toml::from_str(toml_str)?;
        model.validate()?;

        Ok(model)
    }

    /// Read a model from `model.toml` in the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The validated model or an error if the file is missing or invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let file_path = model_dir.as_ref().join(MODEL_FILE_NAME);
        let model: Model = read_toml(&file_path)?;
        model
            .validate()
            .with_context(|| input_err_msg(&file_path))?;

        Ok(model)
    }

    /// Check the model is internally consistent.
    ///
    /// This is called when a model is created or read, but as the fields are public it is checked
    /// again before building an optimisation problem.
    pub fn validate(&self) -> Result<()> {
        self.parameters.validate()?;
        check_generators(&self.generators)?;
        check_load(&self.load, self.horizon())?;
        check_aggregators(
            &self.aggregators,
            self.horizon(),
            self.parameters.require_stop_within_horizon,
        )?;

        Ok(())
    }

    /// The horizon over which units are committed
    pub fn horizon(&self) -> Horizon {
        self.parameters.horizon()
    }

    /// The forecast load for the given hour
    pub fn load_at(&self, hour: Hour) -> Power {
        self.load[hour]
    }

    /// Iterate over the indexes of generators
    pub fn iter_generator_indexes(&self) -> impl Iterator<Item = usize> {
        0..self.generators.len()
    }

    /// Iterate over the indexes of aggregators
    pub fn iter_aggregator_indexes(&self) -> impl Iterator<Item = usize> {
        0..self.aggregators.len()
    }

    /// Iterate over every demand-response offer
    pub fn iter_offers(&self) -> impl Iterator<Item = (OfferID, &Offer)> {
        iter_offers(&self.aggregators)
    }

    /// Get the offer with the given ID
    pub fn offer(&self, id: OfferID) -> &Offer {
        &self.aggregators[id.aggregator].offers[id.offer]
    }

    /// A two-unit fleet serving a typical daily load curve, without demand response
    pub fn example() -> Self {
        let generators = vec![
            Generator {
                fixed_cost: Money(177.0),
                marginal_cost: MoneyPerEnergy(13.5),
                max_power: Power(220.0),
                startup_cost: Money(100.0),
                shutdown_cost: Money(50.0),
            },
            Generator {
                fixed_cost: Money(137.0),
                marginal_cost: MoneyPerEnergy(17.7),
                max_power: Power(66.0),
                startup_cost: Money(20.0),
                shutdown_cost: Money(10.0),
            },
        ];
        let load = [
            166.4, 156.0, 150.8, 145.6, 145.6, 150.8, 166.4, 197.6, 226.2, 247.0, 257.4, 260.0,
            257.4, 260.0, 260.0, 252.2, 249.6, 249.6, 241.8, 239.2, 239.2, 241.8, 226.2, 187.2,
        ]
        .into_iter()
        .map(Power)
        .collect();

        Self {
            parameters: ModelParameters::default(),
            generators,
            load,
            aggregators: Vec::new(),
        }
    }

    /// The example model with two demand-response aggregators, each making three offers
    pub fn example_with_demand_response() -> Self {
        fn offer(
            quantity: f64,
            price: f64,
            initiation_cost: f64,
            min_duration: usize,
        ) -> Offer {
            Offer {
                quantity: Power(quantity),
                price: MoneyPerEnergy(price),
                initiation_cost: Money(initiation_cost),
                min_duration,
                max_activations: 1,
            }
        }

        let aggregators = vec![
            Aggregator {
                offers: vec![
                    offer(20.07, 12.0, 20.0, 2),
                    offer(13.78, 14.0, 23.0, 4),
                    offer(9.72, 15.0, 26.0, 8),
                ],
            },
            Aggregator {
                offers: vec![
                    offer(21.36, 12.0, 22.0, 2),
                    offer(14.03, 14.0, 25.0, 4),
                    offer(11.28, 15.0, 28.0, 8),
                ],
            },
        ];

        Self {
            aggregators,
            ..Self::example()
        }
    }
}

/// Check the load forecast covers the horizon with valid values
fn check_load(load: &[Power], horizon: Horizon) -> Result<()> {
    ensure!(
        load.len() == horizon.num_hours(),
        "Load forecast has {} values, but the horizon is {} hours long",
        load.len(),
        horizon.num_hours()
    );

    for (hour, value) in load.iter().enumerate() {
        check_non_negative(*value, &format!("Load for hour {hour}"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::units::Dimensionless;
    use std::fs;
    use tempfile::tempdir;

    const MODEL_TOML: &str = r#"
load = [100, 120.5, 90]

[parameters]
horizon_hours = 3
reserve_fraction = 0.05

[[generators]]
fixed_cost = 177
marginal_cost = 13.5
max_power = 220
startup_cost = 100
shutdown_cost = 50

[[aggregators]]
[[aggregators.offers]]
quantity = 20.07
price = 12
initiation_cost = 20
min_duration = 2
max_activations = 1
"#;

    #[test]
    fn example_models_are_valid() {
        Model::example().validate().unwrap();
        Model::example_with_demand_response().validate().unwrap();
    }

    #[test]
    fn from_toml_str_works() {
        let model = Model::from_toml_str(MODEL_TOML).unwrap();
        assert_eq!(model.horizon(), Horizon::new(3));
        assert_eq!(model.parameters.reserve_fraction, Dimensionless(0.05));
        assert_eq!(model.load, [Power(100.0), Power(120.5), Power(90.0)]);
        assert_eq!(model.generators.len(), 1);
        assert_eq!(model.iter_offers().count(), 1);
        assert_eq!(
            model
                .offer(OfferID {
                    aggregator: 0,
                    offer: 0
                })
                .min_duration,
            2
        );
    }

    #[test]
    fn from_path_works() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MODEL_FILE_NAME), MODEL_TOML).unwrap();
        let model = Model::from_path(dir.path()).unwrap();
        assert_eq!(model.load_at(1), Power(120.5));
    }

    #[test]
    fn from_path_invalid_model() {
        let dir = tempdir().unwrap();
        let toml_str = MODEL_TOML.replace("horizon_hours = 3", "horizon_hours = 4");
        fs::write(dir.path().join(MODEL_FILE_NAME), toml_str).unwrap();
        let err = Model::from_path(dir.path()).unwrap_err();
        assert_eq!(
            err.root_cause().to_string(),
            "Load forecast has 3 values, but the horizon is 4 hours long"
        );
    }

    #[test]
    fn load_length_mismatch() {
        let mut model = Model::example();
        model.load.pop();
        assert_error!(
            model.validate(),
            "Load forecast has 23 values, but the horizon is 24 hours long"
        );
    }

    #[test]
    fn negative_load() {
        let mut model = Model::example();
        model.load[3] = Power(-1.0);
        assert_error!(
            model.validate(),
            "Load for hour 3 must be a finite number greater than or equal to zero"
        );
    }

    #[test]
    fn zero_hour_horizon() {
        let result = Model::new(
            ModelParameters {
                horizon_hours: 0,
                ..ModelParameters::default()
            },
            Model::example().generators,
            Vec::new(),
            Vec::new(),
        );
        assert_error!(result, "horizon_hours cannot be zero");
    }

    #[test]
    fn no_generators() {
        let result = Model::new(
            ModelParameters::default(),
            Vec::new(),
            Model::example().load,
            Vec::new(),
        );
        assert_error!(result, "No generators provided");
    }

    #[test]
    fn offer_lasting_whole_horizon() {
        let mut model = Model::example_with_demand_response();
        model.aggregators[0].offers[1].min_duration = 24;
        let err = model.validate().unwrap_err();
        assert_eq!(
            err.root_cause().to_string(),
            "min_duration (24) must be shorter than the horizon (24 hours) for an activation to \
            stop within it"
        );

        // Allowed if activations may run to the end of the horizon
        model.parameters.require_stop_within_horizon = false;
        model.validate().unwrap();
    }

    #[test]
    fn reserve_fraction_out_of_range() {
        let mut model = Model::example();
        model.parameters.reserve_fraction = Dimensionless(1.2);
        assert_error!(
            model.validate(),
            "reserve_fraction must be a number between 0 and 1"
        );
    }
}
