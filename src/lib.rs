//! Day-ahead unit commitment, optionally with demand response, formulated as a mixed-integer
//! linear program.
//!
//! The typical flow is:
//!
//! 1. Describe the fleet, load forecast and (optionally) demand-response aggregators with a
//!    [`model::Model`].
//! 2. Build the base problem with [`optimisation::build_unit_commitment`] and, if required, extend
//!    it with [`optimisation::UnitCommitmentProblem::with_demand_response`].
//! 3. Solve it with [`optimisation::UnitCommitmentProblem::solve`].
//! 4. Convert the solution into a table with [`output::ResultsTable::from_solution`].
pub mod aggregator;
pub mod generator;
pub mod horizon;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod problem;
pub mod settings;
pub mod units;

#[cfg(test)]
mod fixture;
