//! Export of solved schedules as a table with one row per hour.
use crate::optimisation::Solution;
use crate::units::Money;
use anyhow::{Context, Result};
use csv::Writer;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The name of the column holding the hour index in CSV output
const HOUR_COLUMN: &str = "hour";

/// A solved schedule, as named columns of hourly values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsTable {
    /// The total cost of the schedule
    pub objective_value: Money,
    columns: IndexMap<String, Vec<f64>>,
}

fn indicator(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

impl ResultsTable {
    /// Tabulate a solution.
    ///
    /// Columns are: demand; per unit production, commitment state, spinning reserve, startup
    /// cost and shutdown cost; and, if the problem includes demand response, per aggregator load
    /// reduction and cost, followed by per offer initiation cost and activation, start and stop
    /// indicators.
    pub fn from_solution(solution: &Solution) -> Self {
        let model = solution.model();
        let hours = || model.horizon().iter();
        let mut columns = IndexMap::new();
        let mut add_column = |name: String, values: Vec<f64>| {
            columns.insert(name, values);
        };

        add_column(
            "demand".into(),
            hours().map(|t| model.load_at(t).value()).collect(),
        );

        for i in model.iter_generator_indexes() {
            add_column(
                format!("prod_unit_{i}"),
                hours().map(|t| solution.production(i, t).value()).collect(),
            );
            add_column(
                format!("state_unit_{i}"),
                hours().map(|t| indicator(solution.state(i, t))).collect(),
            );
            add_column(
                format!("spin_res_unit_{i}"),
                hours().map(|t| solution.reserve(i, t).value()).collect(),
            );
            add_column(
                format!("startup_cost_unit_{i}"),
                hours().map(|t| solution.startup_cost(i, t).value()).collect(),
            );
            add_column(
                format!("shutdown_cost_unit_{i}"),
                hours().map(|t| solution.shutdown_cost(i, t).value()).collect(),
            );
        }

        if solution.has_demand_response() {
            for d in model.iter_aggregator_indexes() {
                add_column(
                    format!("load_red_agg_{d}"),
                    hours().map(|t| solution.load_reduction(d, t).value()).collect(),
                );
                add_column(
                    format!("dr_cost_agg_{d}"),
                    hours().map(|t| solution.dr_cost(d, t).value()).collect(),
                );
            }

            for (id, _) in model.iter_offers() {
                let suffix = format!("agg_{}_off_{}", id.aggregator, id.offer);
                add_column(
                    format!("dr_init_cost_{suffix}"),
                    hours().map(|t| solution.initiation_cost(id, t).value()).collect(),
                );
                add_column(
                    format!("u_{suffix}"),
                    hours().map(|t| indicator(solution.is_active(id, t))).collect(),
                );
                add_column(
                    format!("y_{suffix}"),
                    hours().map(|t| indicator(solution.starts(id, t))).collect(),
                );
                add_column(
                    format!("z_{suffix}"),
                    hours().map(|t| indicator(solution.stops(id, t))).collect(),
                );
            }
        }

        Self {
            objective_value: solution.objective_value,
            columns,
        }
    }

    /// The values of the named column, if present
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// The column names, in output order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// The number of rows (hours) in the table
    pub fn num_rows(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    /// Render the table as CSV, with a leading hour column
    pub fn to_csv_string(&self) -> Result<String> {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(std::iter::once(HOUR_COLUMN).chain(self.column_names()))?;
        for hour in 0..self.num_rows() {
            let record = std::iter::once(hour.to_string())
                .chain(self.columns.values().map(|values| values[hour].to_string()));
            wtr.write_record(record)?;
        }
        wtr.flush()?;
        let inner = wtr.into_inner()?;

        Ok(String::from_utf8(inner)?)
    }

    /// Write the table to a CSV file
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let contents = self.to_csv_string()?;
        fs::write(path, contents)
            .with_context(|| format!("Could not write results to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{dr_model, model};
    use crate::model::Model;
    use crate::optimisation::build_unit_commitment;
    use crate::settings::Settings;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn base_columns(model: Model) {
        let uc = build_unit_commitment(&model).unwrap();
        let solution = uc.solve(&Settings::default()).unwrap();
        let table = ResultsTable::from_solution(&solution);

        assert_eq!(table.num_rows(), 24);
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            [
                "demand",
                "prod_unit_0",
                "state_unit_0",
                "spin_res_unit_0",
                "startup_cost_unit_0",
                "shutdown_cost_unit_0",
                "prod_unit_1",
                "state_unit_1",
                "spin_res_unit_1",
                "startup_cost_unit_1",
                "shutdown_cost_unit_1",
            ]
        );
        assert_eq!(table.column("demand").unwrap()[11], 260.0);
        assert!(table.column("load_red_agg_0").is_none());
        assert_approx_eq!(
            f64,
            table.objective_value.value(),
            solution.objective_value.value()
        );

        // Production in each hour matches the demand
        for t in 0..24 {
            let produced =
                table.column("prod_unit_0").unwrap()[t] + table.column("prod_unit_1").unwrap()[t];
            assert_approx_eq!(
                f64,
                produced,
                table.column("demand").unwrap()[t],
                epsilon = 1e-6
            );
        }
    }

    #[rstest]
    fn demand_response_columns(dr_model: Model) {
        let uc = build_unit_commitment(&dr_model)
            .unwrap()
            .with_demand_response()
            .unwrap();
        let solution = uc.solve(&Settings::default()).unwrap();
        let table = ResultsTable::from_solution(&solution);

        // 1 demand column + 5 per unit + 2 per aggregator + 4 per offer
        assert_eq!(table.column_names().count(), 1 + 5 * 2 + 2 * 2 + 4 * 6);
        for name in [
            "load_red_agg_1",
            "dr_cost_agg_1",
            "dr_init_cost_agg_1_off_2",
            "u_agg_0_off_0",
            "y_agg_0_off_0",
            "z_agg_0_off_0",
        ] {
            assert_eq!(table.column(name).unwrap().len(), 24, "{name}");
        }
    }

    #[rstest]
    fn write_csv(model: Model) {
        let uc = build_unit_commitment(&model).unwrap();
        let solution = uc.solve(&Settings::default()).unwrap();
        let table = ResultsTable::from_solution(&solution);

        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        table.write_csv(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 25);
        assert!(lines[0].starts_with("hour,demand,prod_unit_0,state_unit_0"));
        assert!(lines[12].starts_with("11,260,"));
    }
}
