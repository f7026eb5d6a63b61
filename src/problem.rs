//! A solver-independent representation of a mixed-integer linear program.
//!
//! Columns (decision variables) and rows (linear constraints) are accumulated here while the model
//! is built and are only handed to a solver once the problem is complete. Unlike the solver's own
//! problem type, rows can be extended with extra terms after they have been added, which allows an
//! extension to modify constraints added by an earlier construction step.
use std::fmt;
use std::ops::{Bound, RangeBounds};

/// A decision variable in the optimisation.
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(usize);

impl Variable {
    /// The index of the column in the problem
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identifies a row (constraint) in the problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowID(usize);

impl RowID {
    /// The index of the row in the problem
    pub fn index(self) -> usize {
        self.0
    }
}

/// The set of values a variable may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Any real value within the bounds
    Continuous,
    /// Either zero or one
    Binary,
}

/// A column of the problem
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Human-readable name, used for debugging
    pub name: String,
    /// Coefficient in the objective function
    pub cost: f64,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Domain of the variable
    pub domain: Domain,
}

/// A linear constraint: `lower <= sum(coeff * var) <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Terms of the linear expression
    pub terms: Vec<(Variable, f64)>,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
}

impl Row {
    /// Evaluate the linear expression for the given variable values
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * values[var.index()])
            .sum()
    }

    /// Whether the given variable values satisfy this constraint, to within `tolerance`
    pub fn is_satisfied_by(&self, values: &[f64], tolerance: f64) -> bool {
        let activity = self.activity(values);
        activity >= self.lower - tolerance && activity <= self.upper + tolerance
    }
}

/// Convert a range into a pair of (possibly infinite) bounds
fn to_bounds<B: RangeBounds<f64>>(bounds: &B) -> (f64, f64) {
    let lower = match bounds.start_bound() {
        Bound::Included(&x) | Bound::Excluded(&x) => x,
        Bound::Unbounded => f64::NEG_INFINITY,
    };
    let upper = match bounds.end_bound() {
        Bound::Included(&x) | Bound::Excluded(&x) => x,
        Bound::Unbounded => f64::INFINITY,
    };
    assert!(lower <= upper, "Invalid bounds: {lower} > {upper}");

    (lower, upper)
}

/// A mixed-integer linear program with a minimisation objective
#[derive(Debug, Clone, Default)]
pub struct Problem {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Problem {
    /// Add a continuous variable with the given objective coefficient and bounds
    pub fn add_column<B: RangeBounds<f64>>(
        &mut self,
        name: impl Into<String>,
        cost: f64,
        bounds: B,
    ) -> Variable {
        let (lower, upper) = to_bounds(&bounds);
        self.push_column(Column {
            name: name.into(),
            cost,
            lower,
            upper,
            domain: Domain::Continuous,
        })
    }

    /// Add a binary variable with the given objective coefficient
    pub fn add_binary_column(&mut self, name: impl Into<String>, cost: f64) -> Variable {
        self.push_column(Column {
            name: name.into(),
            cost,
            lower: 0.0,
            upper: 1.0,
            domain: Domain::Binary,
        })
    }

    fn push_column(&mut self, column: Column) -> Variable {
        assert!(column.cost.is_finite(), "Non-finite cost for {}", column.name);
        self.columns.push(column);
        Variable(self.columns.len() - 1)
    }

    /// Add a constraint `bounds.start <= sum(coeff * var) <= bounds.end`
    pub fn add_row<B, I>(&mut self, bounds: B, terms: I) -> RowID
    where
        B: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let (lower, upper) = to_bounds(&bounds);
        let row = Row {
            terms: terms.into_iter().collect(),
            lower,
            upper,
        };
        for (var, _) in &row.terms {
            assert!(var.index() < self.columns.len(), "Unknown variable in row");
        }
        self.rows.push(row);

        RowID(self.rows.len() - 1)
    }

    /// Add terms to an existing row, leaving its bounds unchanged
    pub fn extend_row<I>(&mut self, row: RowID, terms: I)
    where
        I: IntoIterator<Item = (Variable, f64)>,
    {
        self.rows[row.index()].terms.extend(terms);
    }

    /// The number of columns
    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// The number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// The number of binary columns
    pub fn num_binary_cols(&self) -> usize {
        self.columns
            .iter()
            .filter(|col| col.domain == Domain::Binary)
            .count()
    }

    /// All columns, in the order they were added
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get the column for a variable
    pub fn column(&self, var: Variable) -> &Column {
        &self.columns[var.index()]
    }

    /// All rows, in the order they were added
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Get a row by its ID
    pub fn row(&self, id: RowID) -> &Row {
        &self.rows[id.index()]
    }

    /// Evaluate the objective function for the given variable values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        assert_eq!(values.len(), self.columns.len());
        self.columns
            .iter()
            .zip(values)
            .map(|(col, value)| col.cost * value)
            .sum()
    }

    /// Find the rows which are not satisfied by the given variable values.
    ///
    /// Values must be given for every column, in column order.
    pub fn violated_rows(&self, values: &[f64], tolerance: f64) -> Vec<RowID> {
        assert_eq!(values.len(), self.columns.len());
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_satisfied_by(values, tolerance))
            .map(|(idx, _)| RowID(idx))
            .collect()
    }

    /// Find the columns whose values lie outside their bounds or, for binary columns, are not
    /// integral
    pub fn violated_columns(&self, values: &[f64], tolerance: f64) -> Vec<Variable> {
        assert_eq!(values.len(), self.columns.len());
        self.columns
            .iter()
            .zip(values)
            .enumerate()
            .filter(|(_, (col, value))| {
                let value = **value;
                let out_of_bounds = value < col.lower - tolerance || value > col.upper + tolerance;
                let fractional =
                    col.domain == Domain::Binary && (value - value.round()).abs() > tolerance;
                out_of_bounds || fractional
            })
            .map(|(idx, _)| Variable(idx))
            .collect()
    }

    /// Whether the given values satisfy every bound, domain and constraint
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        self.violated_columns(values, tolerance).is_empty()
            && self.violated_rows(values, tolerance).is_empty()
    }
}

/// Write a linear expression using the columns' names, e.g. `x - 2 y`
fn write_terms<'a, I>(f: &mut fmt::Formatter<'_>, columns: &[Column], terms: I) -> fmt::Result
where
    I: IntoIterator<Item = &'a (Variable, f64)>,
{
    let mut first = true;
    for &(var, coeff) in terms {
        let name = &columns[var.index()].name;
        let sign = if coeff < 0.0 { "-" } else { "+" };
        let abs = coeff.abs();
        if first {
            if coeff < 0.0 {
                write!(f, "-")?;
            }
        } else {
            write!(f, " {sign} ")?;
        }
        if (abs - 1.0).abs() > f64::EPSILON {
            write!(f, "{abs} ")?;
        }
        write!(f, "{name}")?;
        first = false;
    }

    if first { write!(f, "0") } else { Ok(()) }
}

/// Renders the problem in a readable LP-like format, for debugging
impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "minimise")?;
        write!(f, "  ")?;
        let objective: Vec<_> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col.cost != 0.0)
            .map(|(idx, col)| (Variable(idx), col.cost))
            .collect();
        write_terms(f, &self.columns, &objective)?;
        writeln!(f)?;

        writeln!(f, "subject to")?;
        for (idx, row) in self.rows.iter().enumerate() {
            write!(f, "  r{idx}: ")?;
            let finite_lower = row.lower.is_finite().then_some(row.lower);
            let finite_upper = row.upper.is_finite().then_some(row.upper);
            match (finite_lower, finite_upper) {
                (Some(lower), Some(upper)) if lower == upper => {
                    write_terms(f, &self.columns, &row.terms)?;
                    writeln!(f, " = {lower}")?;
                }
                (Some(lower), Some(upper)) => {
                    write!(f, "{lower} <= ")?;
                    write_terms(f, &self.columns, &row.terms)?;
                    writeln!(f, " <= {upper}")?;
                }
                (Some(lower), None) => {
                    write_terms(f, &self.columns, &row.terms)?;
                    writeln!(f, " >= {lower}")?;
                }
                (None, Some(upper)) => {
                    write_terms(f, &self.columns, &row.terms)?;
                    writeln!(f, " <= {upper}")?;
                }
                (None, None) => {
                    write_terms(f, &self.columns, &row.terms)?;
                    writeln!(f, " free")?;
                }
            }
        }

        // Continuous columns default to [0, inf)
        let bounded = self.columns.iter().filter(|col| {
            col.domain == Domain::Continuous && (col.lower != 0.0 || col.upper != f64::INFINITY)
        });
        for (idx, col) in bounded.enumerate() {
            if idx == 0 {
                writeln!(f, "bounds")?;
            }
            writeln!(f, "  {} <= {} <= {}", col.lower, col.name, col.upper)?;
        }

        let binary: Vec<_> = self
            .columns
            .iter()
            .filter(|col| col.domain == Domain::Binary)
            .map(|col| col.name.as_str())
            .collect();
        if !binary.is_empty() {
            writeln!(f, "binary")?;
            writeln!(f, "  {}", binary.join(" "))?;
        }

        Ok(())
    }
}
