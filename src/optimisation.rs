//! Code for building and solving the unit commitment optimisation.
//!
//! The problem is built in steps, each taking and returning a [`UnitCommitmentProblem`]:
//!
//! 1. [`build_unit_commitment`] adds the variables, objective and constraints for the generating
//!    fleet.
//! 2. [`UnitCommitmentProblem::with_demand_response`] optionally adds demand-response aggregators,
//!    which reduce the load the fleet must serve.
//!
//! The finished problem is then passed to the solver with [`UnitCommitmentProblem::solve`].
use crate::aggregator::OfferID;
use crate::horizon::{Horizon, Hour};
use crate::model::Model;
use crate::problem::{Domain, Problem, Variable};
use crate::settings::Settings;
use crate::units::{Money, Power};
use anyhow::Result;
use highs::{HighsModelStatus, HighsStatus, RowProblem, Sense};
use indexmap::IndexSet;
use itertools::iproduct;
use log::{debug, info, trace};
use std::error::Error;
use std::fmt;
use std::hash::Hash;

mod constraints;
pub use constraints::ConstraintKeys;
use constraints::add_model_constraints;

pub mod demand_response;
pub use demand_response::{DemandResponseConstraintKeys, DemandResponseVariableMap};

/// A family of variables with one variable for every key and hour.
///
/// Variables are stored contiguously, with all the hours for one key next to each other, and are
/// looked up by the (key, hour) pair. The keys are ordered (see [`IndexSet`]).
#[derive(Debug, Clone)]
pub struct VariableGrid<K> {
    keys: IndexSet<K>,
    num_hours: usize,
    vars: Vec<Variable>,
}

impl<K: Copy + Eq + Hash> VariableGrid<K> {
    /// Add one variable to the problem for every combination of key and hour.
    ///
    /// # Arguments
    ///
    /// * `problem` - The optimisation problem
    /// * `keys` - The entities to add variables for
    /// * `horizon` - The hours to add variables for
    /// * `add_var` - Adds a single variable to the problem
    fn add_to_problem<I, F>(problem: &mut Problem, keys: I, horizon: Horizon, mut add_var: F) -> Self
    where
        I: IntoIterator<Item = K>,
        F: FnMut(&mut Problem, K, Hour) -> Variable,
    {
        let keys: IndexSet<K> = keys.into_iter().collect();
        let vars = iproduct!(keys.iter(), horizon.iter())
            .map(|(&key, hour)| add_var(problem, key, hour))
            .collect();

        Self {
            keys,
            num_hours: horizon.num_hours(),
            vars,
        }
    }

    /// Get the [`Variable`] for the given key and hour
    pub fn get(&self, key: K, hour: Hour) -> Variable {
        self.hours(key)[hour]
    }

    /// The variables for every hour for the given key
    pub fn hours(&self, key: K) -> &[Variable] {
        let idx = self
            .keys
            .get_index_of(&key)
            .expect("No variable found for given key");
        let start = idx * self.num_hours;

        &self.vars[start..start + self.num_hours]
    }

    /// Iterate over the keys
    pub fn keys(&self) -> impl Iterator<Item = K> {
        self.keys.iter().copied()
    }

    /// Iterate over every (key, hour, variable) combination
    pub fn iter(&self) -> impl Iterator<Item = (K, Hour, Variable)> {
        iproduct!(self.keys.iter().copied(), 0..self.num_hours)
            .zip(self.vars.iter().copied())
            .map(|((key, hour), var)| (key, hour, var))
    }
}

/// Variables for the generating fleet, each indexed by unit and hour
#[derive(Debug, Clone)]
pub struct VariableMap {
    /// Commitment state (binary)
    pub state: VariableGrid<usize>,
    /// Production
    pub production: VariableGrid<usize>,
    /// Spinning reserve
    pub reserve: VariableGrid<usize>,
    /// Startup cost
    pub startup_cost: VariableGrid<usize>,
    /// Shutdown cost
    pub shutdown_cost: VariableGrid<usize>,
}

impl VariableMap {
    /// Add the fleet's variables to the problem, with their objective coefficients.
    ///
    /// The objective is the sum over hours and units of the fixed cost for committed units, the
    /// marginal cost of production, the reserve price and the startup and shutdown costs.
    fn add_to_problem(problem: &mut Problem, model: &Model) -> Self {
        let horizon = model.horizon();
        let units = || model.iter_generator_indexes();
        let reserve_price_factor = model.parameters.reserve_price_factor;

        let state = VariableGrid::add_to_problem(problem, units(), horizon, |problem, i, t| {
            let cost = model.generators[i].fixed_cost;
            problem.add_binary_column(format!("state[{i},{t}]"), cost.value())
        });
        let production = VariableGrid::add_to_problem(problem, units(), horizon, |problem, i, t| {
            let cost = model.generators[i].marginal_cost;
            problem.add_column(format!("production[{i},{t}]"), cost.value(), 0.0..)
        });
        let reserve = VariableGrid::add_to_problem(problem, units(), horizon, |problem, i, t| {
            let cost = reserve_price_factor * model.generators[i].marginal_cost;
            problem.add_column(format!("spinning_reserve[{i},{t}]"), cost.value(), 0.0..)
        });

        // The transition costs are only bounded from below by the constraints, so they must
        // appear in the objective for the bounds to be tight
        let startup_cost = VariableGrid::add_to_problem(problem, units(), horizon, |problem, i, t| {
            problem.add_column(format!("startup_cost[{i},{t}]"), 1.0, 0.0..)
        });
        let shutdown_cost = VariableGrid::add_to_problem(problem, units(), horizon, |problem, i, t| {
            problem.add_column(format!("shutdown_cost[{i},{t}]"), 1.0, 0.0..)
        });

        Self {
            state,
            production,
            reserve,
            startup_cost,
            shutdown_cost,
        }
    }
}

/// A unit commitment problem under construction.
///
/// This holds the problem itself along with the variables and constraint rows needed to extend it
/// and to interpret its solution.
#[derive(Debug, Clone)]
pub struct UnitCommitmentProblem<'a> {
    model: &'a Model,
    problem: Problem,
    variables: VariableMap,
    constraint_keys: ConstraintKeys,
    dr_variables: Option<DemandResponseVariableMap>,
    dr_constraint_keys: Option<DemandResponseConstraintKeys>,
}

/// Build the unit commitment problem for the generating fleet.
///
/// The model is validated first, so invalid input is reported before anything is passed to the
/// solver.
///
/// For a detailed description of the constraints, see the [`constraints`] module.
pub fn build_unit_commitment(model: &Model) -> Result<UnitCommitmentProblem<'_>> {
    model.validate()?;

    let mut problem = Problem::default();
    let variables = VariableMap::add_to_problem(&mut problem, model);
    let constraint_keys = add_model_constraints(&mut problem, &variables, model);
    debug!(
        "Built unit commitment problem with {} columns ({} binary) and {} rows",
        problem.num_cols(),
        problem.num_binary_cols(),
        problem.num_rows()
    );

    Ok(UnitCommitmentProblem {
        model,
        problem,
        variables,
        constraint_keys,
        dr_variables: None,
        dr_constraint_keys: None,
    })
}

impl<'a> UnitCommitmentProblem<'a> {
    /// The model this problem was built from
    pub fn model(&self) -> &'a Model {
        self.model
    }

    /// The underlying optimisation problem
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Variables for the generating fleet
    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    /// Rows for the fleet's constraints
    pub fn constraint_keys(&self) -> &ConstraintKeys {
        &self.constraint_keys
    }

    /// Variables for demand response, if it has been added
    pub fn dr_variables(&self) -> Option<&DemandResponseVariableMap> {
        self.dr_variables.as_ref()
    }

    /// Rows for the demand-response constraints, if it has been added
    pub fn dr_constraint_keys(&self) -> Option<&DemandResponseConstraintKeys> {
        self.dr_constraint_keys.as_ref()
    }

    /// Add a constraint fixing a variable to the given value.
    ///
    /// This can be used to force a particular decision, e.g. to check whether it is permitted.
    pub fn fix_variable(&mut self, var: Variable, value: f64) {
        self.problem.add_row(value..=value, [(var, 1.0)]);
    }

    /// Solve the problem.
    ///
    /// # Returns
    ///
    /// The optimal solution or, if none was found, the reason why not. Variable values are never
    /// returned for a non-optimal outcome.
    pub fn solve(&self, settings: &Settings) -> Result<Solution<'_>, ModelError> {
        info!(
            "Solving unit commitment problem ({} columns, {} rows)...",
            self.problem.num_cols(),
            self.problem.num_rows()
        );
        trace!("Problem formulation:\n{}", self.problem);
        let solved = solve_optimal(&self.problem, settings)?;
        let objective_value = Money(solved.objective_value());
        info!("Found optimal solution with total cost {objective_value}");

        Ok(Solution {
            problem: self,
            values: solved.get_solution().columns().to_vec(),
            objective_value,
        })
    }
}

/// The status of a solve, as reported by the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// An optimal solution was found
    Optimal,
    /// No solution satisfies the constraints
    Infeasible,
    /// The objective can be decreased without limit
    Unbounded,
    /// The solver stopped without reaching a conclusion (e.g. it hit its time limit)
    NotSolved,
}

impl From<HighsModelStatus> for SolveStatus {
    fn from(status: HighsModelStatus) -> Self {
        match status {
            HighsModelStatus::Optimal => Self::Optimal,
            // Every column is bounded below and every cost is non-negative, so the objective is
            // bounded and the problem must be infeasible
            HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
                Self::Infeasible
            }
            HighsModelStatus::Unbounded => Self::Unbounded,
            _ => Self::NotSolved,
        }
    }
}

/// Defines the possible errors that can occur when running the solver
#[derive(Debug, Clone)]
pub enum ModelError {
    /// The model definition is incoherent.
    ///
    /// Users should not be able to trigger this error.
    Incoherent(HighsStatus),
    /// An optimal solution could not be found
    NonOptimal(SolveStatus),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            ModelError::NonOptimal(SolveStatus::Infeasible) => write!(
                f,
                "The problem is infeasible: the fleet cannot meet the load and reserve \
                requirements with the given constraints"
            ),
            ModelError::NonOptimal(status) => {
                write!(f, "Could not find optimal result: {status:?}")
            }
        }
    }
}

impl Error for ModelError {}

/// Convert a [`Problem`] into the solver's own representation
fn to_highs_problem(problem: &Problem) -> RowProblem {
    let mut highs_problem = RowProblem::default();
    let cols: Vec<highs::Col> = problem
        .columns()
        .iter()
        .map(|col| match col.domain {
            Domain::Continuous => highs_problem.add_column(col.cost, col.lower..=col.upper),
            Domain::Binary => highs_problem.add_integer_column(col.cost, col.lower..=col.upper),
        })
        .collect();

    for row in problem.rows() {
        highs_problem.add_row(
            row.lower..=row.upper,
            row.terms.iter().map(|&(var, coeff)| (cols[var.index()], coeff)),
        );
    }

    highs_problem
}

/// Try to solve the problem, returning an error if the model is incoherent or result is non-optimal
pub fn solve_optimal(
    problem: &Problem,
    settings: &Settings,
) -> Result<highs::SolvedModel, ModelError> {
    let mut model = to_highs_problem(problem).optimise(Sense::Minimise);
    if !settings.solver_output {
        model.make_quiet();
    }
    if let Some(time_limit) = settings.time_limit {
        model.set_option("time_limit", time_limit);
    }
    model.set_option("mip_rel_gap", settings.mip_rel_gap);

    let solved = model.try_solve().map_err(ModelError::Incoherent)?;

    match SolveStatus::from(solved.status()) {
        SolveStatus::Optimal => Ok(solved),
        status => {
            debug!("Solver returned status {:?}", solved.status());
            Err(ModelError::NonOptimal(status))
        }
    }
}

/// The optimal solution to a unit commitment problem
pub struct Solution<'a> {
    problem: &'a UnitCommitmentProblem<'a>,
    values: Vec<f64>,
    /// The total cost of the schedule
    pub objective_value: Money,
}

impl<'a> Solution<'a> {
    /// The model which was solved
    pub fn model(&self) -> &'a Model {
        self.problem.model
    }

    /// The problem which was solved
    pub fn problem(&self) -> &'a UnitCommitmentProblem<'a> {
        self.problem
    }

    /// The value of every column, in column order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The value of the given variable
    pub fn value(&self, var: Variable) -> f64 {
        self.values[var.index()]
    }

    /// The value of a binary variable as a `bool`
    fn is_set(&self, var: Variable) -> bool {
        self.value(var) > 0.5
    }

    /// Whether the unit is committed in the given hour
    pub fn state(&self, unit: usize, hour: Hour) -> bool {
        self.is_set(self.problem.variables.state.get(unit, hour))
    }

    /// Production of the unit in the given hour
    pub fn production(&self, unit: usize, hour: Hour) -> Power {
        Power(self.value(self.problem.variables.production.get(unit, hour)))
    }

    /// Spinning reserve held by the unit in the given hour
    pub fn reserve(&self, unit: usize, hour: Hour) -> Power {
        Power(self.value(self.problem.variables.reserve.get(unit, hour)))
    }

    /// Startup cost for the unit in the given hour
    pub fn startup_cost(&self, unit: usize, hour: Hour) -> Money {
        Money(self.value(self.problem.variables.startup_cost.get(unit, hour)))
    }

    /// Shutdown cost for the unit in the given hour
    pub fn shutdown_cost(&self, unit: usize, hour: Hour) -> Money {
        Money(self.value(self.problem.variables.shutdown_cost.get(unit, hour)))
    }

    /// Whether the solution includes demand response
    pub fn has_demand_response(&self) -> bool {
        self.problem.dr_variables.is_some()
    }

    fn dr_variables(&self) -> &'a DemandResponseVariableMap {
        self.problem
            .dr_variables
            .as_ref()
            .expect("Problem has no demand response")
    }

    /// Load reduction delivered by the aggregator in the given hour
    pub fn load_reduction(&self, aggregator: usize, hour: Hour) -> Power {
        Power(self.value(self.dr_variables().load_reduction.get(aggregator, hour)))
    }

    /// Demand-response cost for the aggregator in the given hour
    pub fn dr_cost(&self, aggregator: usize, hour: Hour) -> Money {
        Money(self.value(self.dr_variables().dr_cost.get(aggregator, hour)))
    }

    /// Initiation cost for the offer in the given hour
    pub fn initiation_cost(&self, offer: OfferID, hour: Hour) -> Money {
        Money(self.value(self.dr_variables().initiation_cost.get(offer, hour)))
    }

    /// Whether the offer is active in the given hour
    pub fn is_active(&self, offer: OfferID, hour: Hour) -> bool {
        self.is_set(self.dr_variables().activation.get(offer, hour))
    }

    /// Whether an activation of the offer starts in the given hour
    pub fn starts(&self, offer: OfferID, hour: Hour) -> bool {
        self.is_set(self.dr_variables().start.get(offer, hour))
    }

    /// Whether an activation of the offer stops in the given hour
    pub fn stops(&self, offer: OfferID, hour: Hour) -> bool {
        self.is_set(self.dr_variables().stop.get(offer, hour))
    }
}
