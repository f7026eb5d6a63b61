//! Code for adding the generating fleet's constraints to the unit commitment problem.
use super::VariableMap;
use crate::model::Model;
use crate::problem::{Problem, RowID};
use std::ops::Range;

/// The rows added for each family of constraints.
///
/// Rows for constraints indexed by unit and hour are stored unit-major, i.e. all the hours for unit
/// 0, then all the hours for unit 1, etc.
#[derive(Debug, Clone)]
pub struct ConstraintKeys {
    /// Market-clearing rows, one per hour
    pub market_clearing: Vec<RowID>,
    /// Rows bounding the startup cost
    pub startup_cost: Range<usize>,
    /// Rows bounding the shutdown cost
    pub shutdown_cost: Range<usize>,
    /// Spinning reserve rows, one per hour
    pub reserve: Range<usize>,
    /// Capacity rows
    pub capacity: Range<usize>,
}

/// Add constraints for the generating fleet.
///
/// # Arguments
///
/// * `problem` - The optimisation problem
/// * `variables` - The fleet's variables
/// * `model` - The model
///
/// # Returns
///
/// The rows added for each family of constraints.
pub fn add_model_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> ConstraintKeys {
    ConstraintKeys {
        market_clearing: add_market_clearing_constraints(problem, variables, model),
        startup_cost: add_startup_cost_constraints(problem, variables, model),
        shutdown_cost: add_shutdown_cost_constraints(problem, variables, model),
        reserve: add_reserve_constraints(problem, variables, model),
        capacity: add_capacity_constraints(problem, variables, model),
    }
}

/// Add rows using `add_row` and return the range of row indexes added
pub(super) fn add_rows<F>(problem: &mut Problem, add_row: F) -> Range<usize>
where
    F: FnOnce(&mut Problem),
{
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = problem.num_rows();
    add_row(problem);

    offset..problem.num_rows()
}

/// Add market-clearing constraints.
///
/// For every hour, the total production of the fleet must equal the forecast load exactly. These
/// rows may later be extended with load reduction from demand response.
fn add_market_clearing_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> Vec<RowID> {
    model
        .horizon()
        .iter()
        .map(|t| {
            let load = model.load_at(t).value();
            let terms = model
                .iter_generator_indexes()
                .map(|i| (variables.production.get(i, t), 1.0));
            problem.add_row(load..=load, terms)
        })
        .collect()
}

/// Add constraints bounding the startup cost from below.
///
/// `startup_cost[i, t] >= startup_price[i] * (state[i, t] - state[i, t - 1])`
///
/// Units are assumed to be off before the first hour, so in the first hour this becomes
/// `startup_cost[i, 0] >= startup_price[i] * state[i, 0]`.
fn add_startup_cost_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> Range<usize> {
    let horizon = model.horizon();
    add_rows(problem, |problem| {
        for (i, generator) in model.generators.iter().enumerate() {
            let price = generator.startup_cost.value();
            for t in horizon.iter() {
                let mut terms = vec![
                    (variables.startup_cost.get(i, t), 1.0),
                    (variables.state.get(i, t), -price),
                ];
                if let Some(prev) = horizon.previous(t) {
                    terms.push((variables.state.get(i, prev), price));
                }
                problem.add_row(0.0.., terms);
            }
        }
    })
}

/// Add constraints bounding the shutdown cost from below.
///
/// `shutdown_cost[i, t] >= shutdown_price[i] * (state[i, t - 1] - state[i, t])`
///
/// In the first hour the cost is bounded by `shutdown_price[i] * (1 - state[i, 0])`.
fn add_shutdown_cost_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> Range<usize> {
    let horizon = model.horizon();
    add_rows(problem, |problem| {
        for (i, generator) in model.generators.iter().enumerate() {
            let price = generator.shutdown_cost.value();
            for t in horizon.iter() {
                let terms = [
                    (variables.shutdown_cost.get(i, t), 1.0),
                    (variables.state.get(i, t), price),
                ];
                match horizon.previous(t) {
                    Some(prev) => {
                        let prev_state = (variables.state.get(i, prev), -price);
                        problem.add_row(0.0.., terms.into_iter().chain([prev_state]))
                    }
                    None => problem.add_row(price.., terms),
                };
            }
        }
    })
}

/// Add spinning reserve requirements.
///
/// For every hour, the total reserve held by the fleet must be at least the reserve fraction of the
/// forecast load.
fn add_reserve_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> Range<usize> {
    let fraction = model.parameters.reserve_fraction;
    add_rows(problem, |problem| {
        for t in model.horizon().iter() {
            let requirement = (fraction * model.load_at(t)).value();
            let terms = model
                .iter_generator_indexes()
                .map(|i| (variables.reserve.get(i, t), 1.0));
            problem.add_row(requirement.., terms);
        }
    })
}

/// Add capacity constraints.
///
/// A unit can only produce or hold reserve when committed, and the two together cannot exceed its
/// maximum power: `production[i, t] + reserve[i, t] <= max_power[i] * state[i, t]`
fn add_capacity_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> Range<usize> {
    add_rows(problem, |problem| {
        for (i, generator) in model.generators.iter().enumerate() {
            for t in model.horizon().iter() {
                problem.add_row(
                    ..=0.0,
                    [
                        (variables.production.get(i, t), 1.0),
                        (variables.reserve.get(i, t), 1.0),
                        (variables.state.get(i, t), -generator.max_power.value()),
                    ],
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::horizon::Hour;
    use crate::optimisation::build_unit_commitment;
    use crate::units::Power;
    use rstest::rstest;

    /// The row for a constraint indexed by unit and hour within a family of rows
    fn unit_hour_row(rows: &Range<usize>, num_hours: usize, unit: usize, hour: Hour) -> usize {
        let idx = rows.start + unit * num_hours + hour;
        assert!(rows.contains(&idx), "Row out of range");

        idx
    }

    /// Variable values for a schedule where unit 0 is always on and unit 1 only runs in the
    /// given hours, with production split to meet load and reserve
    fn schedule_values(model: &Model, unit1_hours: &[Hour]) -> Vec<f64> {
        let uc = build_unit_commitment(model).unwrap();
        let vars = uc.variables();
        let mut values = vec![0.0; uc.problem().num_cols()];
        let mut prev_on = false;
        for t in model.horizon().iter() {
            let load = model.load_at(t).value();
            let reserve = model.parameters.reserve_fraction.value() * load;
            let on = unit1_hours.contains(&t);
            values[vars.state.get(0, t).index()] = 1.0;
            if on {
                values[vars.state.get(1, t).index()] = 1.0;
                values[vars.production.get(1, t).index()] = 40.0;
                values[vars.reserve.get(1, t).index()] = reserve;
                values[vars.production.get(0, t).index()] = load - 40.0;
            } else {
                values[vars.production.get(0, t).index()] = load;
                values[vars.reserve.get(0, t).index()] = reserve;
            }
            if t == 0 {
                values[vars.startup_cost.get(0, t).index()] = 100.0;
            }
            if on && !prev_on {
                values[vars.startup_cost.get(1, t).index()] = 20.0;
            }
            if (t == 0 && !on) || (prev_on && !on) {
                values[vars.shutdown_cost.get(1, t).index()] = 10.0;
            }
            prev_on = on;
        }

        values
    }

    #[rstest]
    fn row_counts(model: Model) {
        let uc = build_unit_commitment(&model).unwrap();
        let keys = uc.constraint_keys();
        assert_eq!(keys.market_clearing.len(), 24);
        assert_eq!(keys.startup_cost.len(), 48);
        assert_eq!(keys.shutdown_cost.len(), 48);
        assert_eq!(keys.reserve.len(), 24);
        assert_eq!(keys.capacity.len(), 48);
        assert_eq!(uc.problem().num_rows(), 24 + 48 + 48 + 24 + 48);
    }

    #[rstest]
    fn market_clearing_row(model: Model) {
        let uc = build_unit_commitment(&model).unwrap();
        let row = uc.problem().row(uc.constraint_keys().market_clearing[11]);
        assert_eq!((row.lower, row.upper), (260.0, 260.0));
        assert_eq!(
            row.terms,
            [
                (uc.variables().production.get(0, 11), 1.0),
                (uc.variables().production.get(1, 11), 1.0)
            ]
        );
    }

    #[rstest]
    fn formulation_uses_column_names(model: Model) {
        let uc = build_unit_commitment(&model).unwrap();
        let row = uc.constraint_keys().market_clearing[11].index();
        let startup_row = unit_hour_row(&uc.constraint_keys().startup_cost, 24, 1, 5);

        let formulation = uc.problem().to_string();
        assert!(formulation.contains(&format!(
            "r{row}: production[0,11] + production[1,11] = 260\n"
        )));
        assert!(formulation.contains(&format!(
            "r{startup_row}: startup_cost[1,5] - 20 state[1,5] + 20 state[1,4] >= 0\n"
        )));
    }

    #[rstest]
    fn startup_rows(model: Model) {
        let uc = build_unit_commitment(&model).unwrap();
        let vars = uc.variables();
        let keys = uc.constraint_keys();

        // First hour: no previous state
        let row = &uc.problem().rows()[unit_hour_row(&keys.startup_cost, 24, 0, 0)];
        assert_eq!(
            row.terms,
            [(vars.startup_cost.get(0, 0), 1.0), (vars.state.get(0, 0), -100.0)]
        );
        assert_eq!(row.lower, 0.0);

        let row = &uc.problem().rows()[unit_hour_row(&keys.startup_cost, 24, 1, 5)];
        assert_eq!(
            row.terms,
            [
                (vars.startup_cost.get(1, 5), 1.0),
                (vars.state.get(1, 5), -20.0),
                (vars.state.get(1, 4), 20.0)
            ]
        );
    }

    #[rstest]
    fn shutdown_rows_use_shutdown_price(model: Model) {
        let uc = build_unit_commitment(&model).unwrap();
        let vars = uc.variables();
        let keys = uc.constraint_keys();

        // First hour: shutdown_cost + 50 * state >= 50
        let row = &uc.problem().rows()[unit_hour_row(&keys.shutdown_cost, 24, 0, 0)];
        assert_eq!(
            row.terms,
            [(vars.shutdown_cost.get(0, 0), 1.0), (vars.state.get(0, 0), 50.0)]
        );
        assert_eq!(row.lower, 50.0);

        // Later hours: shutdown_cost >= 10 * (state[t - 1] - state[t])
        let row = &uc.problem().rows()[unit_hour_row(&keys.shutdown_cost, 24, 1, 7)];
        assert_eq!(
            row.terms,
            [
                (vars.shutdown_cost.get(1, 7), 1.0),
                (vars.state.get(1, 7), 10.0),
                (vars.state.get(1, 6), -10.0)
            ]
        );
        assert_eq!(row.lower, 0.0);
    }

    #[rstest]
    fn reserve_rows(model: Model) {
        let uc = build_unit_commitment(&model).unwrap();
        let row = &uc.problem().rows()[uc.constraint_keys().reserve.start + 11];
        float_cmp::assert_approx_eq!(f64, row.lower, 26.0);
        assert_eq!(row.upper, f64::INFINITY);
    }

    #[rstest]
    fn valid_schedule_satisfies_constraints(model: Model) {
        let uc = build_unit_commitment(&model).unwrap();
        let unit1_hours = (8..23).collect::<Vec<_>>();
        let values = schedule_values(&model, &unit1_hours);
        assert!(uc.problem().violated_rows(&values, 1e-6).is_empty());
        assert!(uc.problem().violated_columns(&values, 1e-6).is_empty());
    }

    #[rstest]
    fn capacity_violation_detected(model: Model) {
        let uc = build_unit_commitment(&model).unwrap();

        // Unit 1 is needed at peak load, so leaving it off overloads unit 0
        let values = schedule_values(&model, &[]);
        let violated = uc.problem().violated_rows(&values, 1e-6);
        let capacity_row = unit_hour_row(&uc.constraint_keys().capacity, 24, 0, 11);
        assert!(violated.iter().any(|row| row.index() == capacity_row));
    }

    #[rstest]
    fn missed_startup_cost_detected(model: Model) {
        let uc = build_unit_commitment(&model).unwrap();
        let unit1_hours = (8..23).collect::<Vec<_>>();
        let mut values = schedule_values(&model, &unit1_hours);
        values[uc.variables().startup_cost.get(1, 8).index()] = 0.0;

        let violated = uc.problem().violated_rows(&values, 1e-6);
        assert_eq!(violated.len(), 1);
        assert_eq!(
            violated[0].index(),
            unit_hour_row(&uc.constraint_keys().startup_cost, 24, 1, 8)
        );
    }

    #[rstest]
    fn custom_horizon(mut model: Model) {
        model.parameters.horizon_hours = 3;
        model.load = vec![Power(100.0), Power(150.0), Power(120.0)];
        let uc = build_unit_commitment(&model).unwrap();
        assert_eq!(uc.constraint_keys().market_clearing.len(), 3);
        assert_eq!(uc.problem().num_cols(), 5 * 2 * 3);
    }
}
