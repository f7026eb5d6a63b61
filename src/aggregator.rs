//! Demand-response aggregators and the offers they make.
//!
//! Each aggregator offers a small number of ranked price tiers. When an offer is activated, the
//! aggregator reduces load by the offered quantity for every hour the activation lasts.
use crate::horizon::Horizon;
use crate::input::check_non_negative;
use crate::units::{Money, MoneyPerEnergy, Power};
use anyhow::{Context, Result, ensure};
use log::warn;
use serde::Deserialize;
use std::fmt;

/// Identifies an offer by the index of its aggregator and its index within that aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OfferID {
    /// Index of the aggregator making the offer
    pub aggregator: usize,
    /// Index of the offer within the aggregator
    pub offer: usize,
}

impl fmt::Display for OfferID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offer {} of aggregator {}", self.offer, self.aggregator)
    }
}

/// A priced, quantity-limited load reduction offered by an aggregator
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Offer {
    /// Load reduction delivered in each hour the offer is active
    pub quantity: Power,
    /// Price per MWh of load reduction
    pub price: MoneyPerEnergy,
    /// Fixed cost incurred each time the offer is activated
    pub initiation_cost: Money,
    /// Minimum number of consecutive hours an activation must last
    pub min_duration: usize,
    /// Maximum number of activations over the horizon
    pub max_activations: u32,
}

impl Offer {
    /// The cost of delivering this offer for one hour, excluding the initiation cost
    pub fn hourly_cost(&self) -> Money {
        self.price * self.quantity
    }

    /// Check the offer can be honoured within the given horizon.
    ///
    /// If activations must stop within the horizon, the minimum duration must leave room for the
    /// stop, i.e. it must be shorter than the horizon.
    pub fn validate(&self, horizon: Horizon, require_stop_within_horizon: bool) -> Result<()> {
        check_non_negative(self.quantity, "quantity")?;
        check_non_negative(self.price, "price")?;
        check_non_negative(self.initiation_cost, "initiation_cost")?;
        ensure!(self.min_duration > 0, "min_duration must be greater than zero");
        ensure!(
            self.min_duration <= horizon.num_hours(),
            "min_duration ({}) cannot exceed the length of the horizon ({} hours)",
            self.min_duration,
            horizon.num_hours()
        );
        if require_stop_within_horizon {
            ensure!(
                self.min_duration < horizon.num_hours(),
                "min_duration ({}) must be shorter than the horizon ({} hours) for an activation \
                to stop within it",
                self.min_duration,
                horizon.num_hours()
            );
        }

        Ok(())
    }
}

/// A demand-response participant
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Aggregator {
    /// The offers made by this aggregator, in order of price tier
    pub offers: Vec<Offer>,
}

/// Iterate over every offer made by the given aggregators
pub fn iter_offers(aggregators: &[Aggregator]) -> impl Iterator<Item = (OfferID, &Offer)> {
    aggregators
        .iter()
        .enumerate()
        .flat_map(|(aggregator, agg)| {
            agg.offers
                .iter()
                .enumerate()
                .map(move |(offer, data)| (OfferID { aggregator, offer }, data))
        })
}

/// Check the aggregators' offers are valid for the given horizon.
///
/// `require_stop_within_horizon` has the same meaning as the model parameter. An empty list is accepted here, as aggregators are only required when demand response is
/// enabled.
pub fn check_aggregators(
    aggregators: &[Aggregator],
    horizon: Horizon,
    require_stop_within_horizon: bool,
) -> Result<()> {
    for (index, aggregator) in aggregators.iter().enumerate() {
        ensure!(
            !aggregator.offers.is_empty(),
            "Aggregator {index} has no offers"
        );
    }

    for (id, offer) in iter_offers(aggregators) {
        offer
            .validate(horizon, require_stop_within_horizon)
            .with_context(|| format!("Invalid data for {id}"))?;

        if offer.max_activations == 0 {
            warn!("max_activations for {id} is zero, so it will never be activated");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{aggregators, assert_error};
    use itertools::Itertools;
    use rstest::rstest;

    #[rstest]
    fn iter_offers_order(aggregators: Vec<Aggregator>) {
        let ids = iter_offers(&aggregators).map(|(id, _)| id).collect_vec();
        assert_eq!(ids.len(), 6);
        assert_eq!(
            ids[..4],
            [
                OfferID {
                    aggregator: 0,
                    offer: 0
                },
                OfferID {
                    aggregator: 0,
                    offer: 1
                },
                OfferID {
                    aggregator: 0,
                    offer: 2
                },
                OfferID {
                    aggregator: 1,
                    offer: 0
                },
            ]
        );
    }

    #[rstest]
    fn check_aggregators_ok(aggregators: Vec<Aggregator>) {
        check_aggregators(&aggregators, Horizon::new(24), true).unwrap();
    }

    #[test]
    fn check_aggregators_no_offers() {
        assert_error!(
            check_aggregators(
                &[Aggregator { offers: Vec::new() }],
                Horizon::new(24),
                true
            ),
            "Aggregator 0 has no offers"
        );
    }

    #[rstest]
    #[case(0, true, "min_duration must be greater than zero")]
    #[case(0, false, "min_duration must be greater than zero")]
    #[case(
        24,
        true,
        "min_duration (24) must be shorter than the horizon (24 hours) for an activation to stop \
        within it"
    )]
    #[case(25, true, "min_duration (25) cannot exceed the length of the horizon (24 hours)")]
    #[case(25, false, "min_duration (25) cannot exceed the length of the horizon (24 hours)")]
    fn check_aggregators_bad_duration(
        mut aggregators: Vec<Aggregator>,
        #[case] min_duration: usize,
        #[case] require_stop_within_horizon: bool,
        #[case] msg: &str,
    ) {
        aggregators[1].offers[2].min_duration = min_duration;
        let err = check_aggregators(&aggregators, Horizon::new(24), require_stop_within_horizon)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid data for offer 2 of aggregator 1");
        assert_eq!(err.root_cause().to_string(), msg);
    }

    #[rstest]
    #[case(23, true)]
    #[case(23, false)]
    #[case(24, false)]
    fn check_aggregators_long_duration_ok(
        mut aggregators: Vec<Aggregator>,
        #[case] min_duration: usize,
        #[case] require_stop_within_horizon: bool,
    ) {
        aggregators[1].offers[2].min_duration = min_duration;
        check_aggregators(&aggregators, Horizon::new(24), require_stop_within_horizon).unwrap();
    }

    #[rstest]
    fn check_aggregators_negative_quantity(mut aggregators: Vec<Aggregator>) {
        aggregators[0].offers[0].quantity = Power(-20.07);
        assert!(check_aggregators(&aggregators, Horizon::new(24), true).is_err());
    }

    #[rstest]
    fn hourly_cost(aggregators: Vec<Aggregator>) {
        let offer = &aggregators[0].offers[0];
        float_cmp::assert_approx_eq!(f64, offer.hourly_cost().value(), 12.0 * 20.07);
    }
}
