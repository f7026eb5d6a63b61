//! Fixtures for tests

use crate::aggregator::Aggregator;
use crate::generator::Generator;
use crate::model::Model;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// The two-unit example model, without demand response
#[fixture]
pub fn model() -> Model {
    Model::example()
}

/// The example model with two demand-response aggregators
#[fixture]
pub fn dr_model() -> Model {
    Model::example_with_demand_response()
}

#[fixture]
pub fn generators(model: Model) -> Vec<Generator> {
    model.generators
}

#[fixture]
pub fn aggregators(dr_model: Model) -> Vec<Aggregator> {
    dr_model.aggregators
}
