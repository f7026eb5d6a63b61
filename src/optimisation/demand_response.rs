//! Demand-response extension to the unit commitment problem.
//!
//! Each aggregator offer behaves like a virtual generator: when active, it reduces the load the
//! fleet must serve by the offered quantity, at the offered price. Activations are described by
//! three binary variables per offer and hour:
//!
//! * `u` - the offer is active in this hour
//! * `y` - an activation starts in this hour
//! * `z` - an activation stops in this hour (i.e. the offer was active in the previous hour)
//!
//! `y` and `z` are derived from the first difference of `u`. The offer is assumed to be inactive
//! before the first hour.
use super::constraints::add_rows;
use super::{UnitCommitmentProblem, VariableGrid};
use crate::aggregator::OfferID;
use crate::horizon::Hour;
use crate::model::Model;
use crate::problem::{Problem, RowID};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use log::debug;
use std::ops::Range;

/// Variables for demand response
#[derive(Debug, Clone)]
pub struct DemandResponseVariableMap {
    /// Total demand-response cost, indexed by aggregator and hour
    pub dr_cost: VariableGrid<usize>,
    /// Total load reduction, indexed by aggregator and hour
    pub load_reduction: VariableGrid<usize>,
    /// Initiation cost, indexed by offer and hour
    pub initiation_cost: VariableGrid<OfferID>,
    /// Activation indicator (`u`), indexed by offer and hour
    pub activation: VariableGrid<OfferID>,
    /// Start indicator (`y`), indexed by offer and hour
    pub start: VariableGrid<OfferID>,
    /// Stop indicator (`z`), indexed by offer and hour
    pub stop: VariableGrid<OfferID>,
}

impl DemandResponseVariableMap {
    fn add_to_problem(problem: &mut Problem, model: &Model) -> Self {
        let horizon = model.horizon();
        let aggregators = || model.iter_aggregator_indexes();
        let offers = || model.iter_offers().map(|(id, _)| id);

        // Only the aggregator totals carry a cost: the per-offer costs are accounted for by the
        // constraints defining the totals
        let dr_cost = VariableGrid::add_to_problem(problem, aggregators(), horizon, |p, d, t| {
            p.add_column(format!("dr_cost[{d},{t}]"), 1.0, 0.0..)
        });
        let load_reduction =
            VariableGrid::add_to_problem(problem, aggregators(), horizon, |p, d, t| {
                p.add_column(format!("load_red[{d},{t}]"), 0.0, 0.0..)
            });
        let initiation_cost = VariableGrid::add_to_problem(problem, offers(), horizon, |p, id, t| {
            p.add_column(
                format!("dr_init_cost[{},{},{t}]", id.offer, id.aggregator),
                0.0,
                0.0..,
            )
        });
        let activation = VariableGrid::add_to_problem(problem, offers(), horizon, |p, id, t| {
            p.add_binary_column(format!("u[{},{},{t}]", id.offer, id.aggregator), 0.0)
        });
        let start = VariableGrid::add_to_problem(problem, offers(), horizon, |p, id, t| {
            p.add_binary_column(format!("y[{},{},{t}]", id.offer, id.aggregator), 0.0)
        });
        let stop = VariableGrid::add_to_problem(problem, offers(), horizon, |p, id, t| {
            p.add_binary_column(format!("z[{},{},{t}]", id.offer, id.aggregator), 0.0)
        });

        Self {
            dr_cost,
            load_reduction,
            initiation_cost,
            activation,
            start,
            stop,
        }
    }
}

/// The rows added for the demand-response constraints.
///
/// Where rows are given as a range, they are stored key-major: all the hours for the first
/// aggregator (or offer), then all the hours for the next, etc.
#[derive(Debug, Clone)]
pub struct DemandResponseConstraintKeys {
    /// Rows defining each aggregator's demand-response cost
    pub dr_cost: Range<usize>,
    /// Rows defining each aggregator's load reduction
    pub load_reduction: Range<usize>,
    /// Rows deriving start and stop indicators from the activation indicator
    pub transition: Range<usize>,
    /// Rows preventing an offer from starting and stopping in the same hour
    pub start_stop_exclusion: Range<usize>,
    /// Rows bounding the initiation cost from below
    pub initiation_cost: Range<usize>,
    /// Minimum duration rows
    pub min_duration: IndexMap<(OfferID, Hour), RowID>,
    /// Stop window rows (absent where the window overruns the horizon and stops outside the
    /// horizon are allowed)
    pub stop_window: IndexMap<(OfferID, Hour), RowID>,
    /// Rows limiting the number of activations of each offer
    pub activation_cap: IndexMap<OfferID, RowID>,
}

impl UnitCommitmentProblem<'_> {
    /// Extend the problem with demand-response aggregators.
    ///
    /// The aggregators' offers are added as variables and constraints, and the market-clearing
    /// constraints are modified so that the fleet only needs to serve the load remaining after
    /// load reduction.
    pub fn with_demand_response(mut self) -> Result<Self> {
        ensure!(
            self.dr_variables.is_none(),
            "Demand response has already been added to this problem"
        );

        let model = self.model;
        ensure!(
            !model.aggregators.is_empty(),
            "Demand response requires at least one aggregator"
        );

        let variables = DemandResponseVariableMap::add_to_problem(&mut self.problem, model);
        let keys = add_demand_response_constraints(&mut self.problem, &variables, model);
        extend_market_clearing_constraints(
            &mut self.problem,
            &self.constraint_keys.market_clearing,
            &variables,
            model,
        );
        debug!(
            "Added demand response for {} offers. Problem now has {} columns ({} binary) and {} \
            rows",
            model.iter_offers().count(),
            self.problem.num_cols(),
            self.problem.num_binary_cols(),
            self.problem.num_rows()
        );

        self.dr_variables = Some(variables);
        self.dr_constraint_keys = Some(keys);

        Ok(self)
    }
}

/// Add load reduction to the market-clearing rows.
///
/// `sum(production[i, t]) + sum(load_reduction[d, t]) = load[t]`
fn extend_market_clearing_constraints(
    problem: &mut Problem,
    market_clearing: &[RowID],
    variables: &DemandResponseVariableMap,
    model: &Model,
) {
    assert_eq!(market_clearing.len(), model.horizon().num_hours());

    for (t, &row) in market_clearing.iter().enumerate() {
        let terms = model
            .iter_aggregator_indexes()
            .map(|d| (variables.load_reduction.get(d, t), 1.0));
        problem.extend_row(row, terms);
    }
}

fn add_demand_response_constraints(
    problem: &mut Problem,
    variables: &DemandResponseVariableMap,
    model: &Model,
) -> DemandResponseConstraintKeys {
    DemandResponseConstraintKeys {
        dr_cost: add_dr_cost_constraints(problem, variables, model),
        load_reduction: add_load_reduction_constraints(problem, variables, model),
        transition: add_transition_constraints(problem, variables, model),
        start_stop_exclusion: add_start_stop_exclusion_constraints(problem, variables, model),
        initiation_cost: add_initiation_cost_constraints(problem, variables, model),
        min_duration: add_min_duration_constraints(problem, variables, model),
        stop_window: add_stop_window_constraints(problem, variables, model),
        activation_cap: add_activation_cap_constraints(problem, variables, model),
    }
}

/// Iterate over the IDs of the offers made by the given aggregator
fn offers_for_aggregator(model: &Model, aggregator: usize) -> impl Iterator<Item = OfferID> {
    (0..model.aggregators[aggregator].offers.len()).map(move |offer| OfferID { aggregator, offer })
}

/// Define each aggregator's hourly cost.
///
/// `dr_cost[d, t] = sum_k(initiation_cost[k, d, t] + price[k, d] * quantity[k, d] * u[k, d, t])`
fn add_dr_cost_constraints(
    problem: &mut Problem,
    variables: &DemandResponseVariableMap,
    model: &Model,
) -> Range<usize> {
    add_rows(problem, |problem| {
        for d in model.iter_aggregator_indexes() {
            for t in model.horizon().iter() {
                let mut terms = vec![(variables.dr_cost.get(d, t), 1.0)];
                for id in offers_for_aggregator(model, d) {
                    let hourly_cost = model.offer(id).hourly_cost().value();
                    terms.push((variables.initiation_cost.get(id, t), -1.0));
                    terms.push((variables.activation.get(id, t), -hourly_cost));
                }
                problem.add_row(0.0..=0.0, terms);
            }
        }
    })
}

/// Define each aggregator's hourly load reduction.
///
/// `load_reduction[d, t] = sum_k(quantity[k, d] * u[k, d, t])`
fn add_load_reduction_constraints(
    problem: &mut Problem,
    variables: &DemandResponseVariableMap,
    model: &Model,
) -> Range<usize> {
    add_rows(problem, |problem| {
        for d in model.iter_aggregator_indexes() {
            for t in model.horizon().iter() {
                let mut terms = vec![(variables.load_reduction.get(d, t), 1.0)];
                for id in offers_for_aggregator(model, d) {
                    let quantity = model.offer(id).quantity.value();
                    terms.push((variables.activation.get(id, t), -quantity));
                }
                problem.add_row(0.0..=0.0, terms);
            }
        }
    })
}

/// Derive start and stop indicators from changes in the activation indicator.
///
/// `y[t] - z[t] = u[t] - u[t - 1]`, or `y[0] - z[0] = u[0]` in the first hour.
fn add_transition_constraints(
    problem: &mut Problem,
    variables: &DemandResponseVariableMap,
    model: &Model,
) -> Range<usize> {
    let horizon = model.horizon();
    add_rows(problem, |problem| {
        for (id, _) in model.iter_offers() {
            for t in horizon.iter() {
                let mut terms = vec![
                    (variables.start.get(id, t), 1.0),
                    (variables.stop.get(id, t), -1.0),
                    (variables.activation.get(id, t), -1.0),
                ];
                if let Some(prev) = horizon.previous(t) {
                    terms.push((variables.activation.get(id, prev), 1.0));
                }
                problem.add_row(0.0..=0.0, terms);
            }
        }
    })
}

/// An offer cannot start and stop in the same hour: `y[t] + z[t] <= 1`
fn add_start_stop_exclusion_constraints(
    problem: &mut Problem,
    variables: &DemandResponseVariableMap,
    model: &Model,
) -> Range<usize> {
    add_rows(problem, |problem| {
        for (id, _) in model.iter_offers() {
            for t in model.horizon().iter() {
                problem.add_row(
                    ..=1.0,
                    [
                        (variables.start.get(id, t), 1.0),
                        (variables.stop.get(id, t), 1.0),
                    ],
                );
            }
        }
    })
}

/// `initiation_cost[t] >= fixed_initiation_cost * y[t]`
fn add_initiation_cost_constraints(
    problem: &mut Problem,
    variables: &DemandResponseVariableMap,
    model: &Model,
) -> Range<usize> {
    add_rows(problem, |problem| {
        for (id, offer) in model.iter_offers() {
            for t in model.horizon().iter() {
                problem.add_row(
                    0.0..,
                    [
                        (variables.initiation_cost.get(id, t), 1.0),
                        (variables.start.get(id, t), -offer.initiation_cost.value()),
                    ],
                );
            }
        }
    })
}

/// An activation must last for at least the offer's minimum duration.
///
/// `sum(u[t..t + min_duration]) >= min_duration * y[t]`
///
/// Near the end of the horizon, the window and the number of hours required are both truncated to
/// the hours remaining.
fn add_min_duration_constraints(
    problem: &mut Problem,
    variables: &DemandResponseVariableMap,
    model: &Model,
) -> IndexMap<(OfferID, Hour), RowID> {
    let horizon = model.horizon();
    let mut keys = IndexMap::new();
    for (id, offer) in model.iter_offers() {
        for t in horizon.iter() {
            let window = horizon.window(t, offer.min_duration);
            #[allow(clippy::cast_precision_loss)]
            let required_hours = window.len() as f64;
            let terms = window
                .map(|h| (variables.activation.get(id, h), 1.0))
                .chain([(variables.start.get(id, t), -required_hours)]);
            keys.insert((id, t), problem.add_row(0.0.., terms));
        }
    }

    keys
}

/// A started activation must register a stop by the end of its minimum-duration window.
///
/// `sum(z[t..=t + min_duration]) >= y[t]`
///
/// Near the end of the horizon the window is truncated to the hours remaining. If stops outside
/// the horizon are allowed, no constraint is added where the window overruns the horizon.
fn add_stop_window_constraints(
    problem: &mut Problem,
    variables: &DemandResponseVariableMap,
    model: &Model,
) -> IndexMap<(OfferID, Hour), RowID> {
    let horizon = model.horizon();
    let require_stop = model.parameters.require_stop_within_horizon;
    let mut keys = IndexMap::new();
    for (id, offer) in model.iter_offers() {
        for t in horizon.iter() {
            if !require_stop && horizon.overruns(t, offer.min_duration) {
                continue;
            }

            let terms = horizon
                .window_inclusive(t, offer.min_duration)
                .map(|h| (variables.stop.get(id, h), 1.0))
                .chain([(variables.start.get(id, t), -1.0)]);
            keys.insert((id, t), problem.add_row(0.0.., terms));
        }
    }

    keys
}

/// Limit the number of activations over the horizon: `sum(y) <= max_activations`
fn add_activation_cap_constraints(
    problem: &mut Problem,
    variables: &DemandResponseVariableMap,
    model: &Model,
) -> IndexMap<OfferID, RowID> {
    model
        .iter_offers()
        .map(|(id, offer)| {
            let terms = variables.start.hours(id).iter().map(|&var| (var, 1.0));
            let row = problem.add_row(..=f64::from(offer.max_activations), terms);
            (id, row)
        })
        .collect()
}
