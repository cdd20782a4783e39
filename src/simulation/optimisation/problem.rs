//! A solver-independent linear program in sparse form.
//!
//! Every column is given a stable integer index when it is added, and each row stores its
//! coefficients as `(column, value)` pairs. The problem can be handed to any [`LpSolver`].
//!
//! [`LpSolver`]: super::solver::LpSolver
use std::ops::{Bound, RangeBounds};

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(usize);

impl Variable {
    /// The column index of this variable
    pub fn index(self) -> usize {
        self.0
    }
}

/// A column of the problem: objective coefficient plus bounds
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Coefficient in the (minimised) objective
    pub cost: f64,
    /// Lower bound (may be `-inf`)
    pub lower: f64,
    /// Upper bound (may be `inf`)
    pub upper: f64,
}

/// A row of the problem: `lower <= sum(coeff * var) <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Lower bound (may be `-inf`)
    pub lower: f64,
    /// Upper bound (may be `inf`)
    pub upper: f64,
    /// Non-zero coefficients
    pub terms: Vec<(Variable, f64)>,
}

/// A linear minimisation problem
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LpProblem {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

/// Convert a range into a pair of finite or infinite bounds
fn range_to_bounds<R: RangeBounds<f64>>(range: &R) -> (f64, f64) {
    let lower = match range.start_bound() {
        Bound::Included(v) | Bound::Excluded(v) => *v,
        Bound::Unbounded => f64::NEG_INFINITY,
    };
    let upper = match range.end_bound() {
        Bound::Included(v) | Bound::Excluded(v) => *v,
        Bound::Unbounded => f64::INFINITY,
    };
    (lower, upper)
}

impl LpProblem {
    /// Add a column with the given objective coefficient and bounds
    pub fn add_column<R: RangeBounds<f64>>(&mut self, cost: f64, bounds: R) -> Variable {
        let (lower, upper) = range_to_bounds(&bounds);
        self.columns.push(Column { cost, lower, upper });
        Variable(self.columns.len() - 1)
    }

    /// Add a row with the given bounds. Returns the row index.
    pub fn add_row<R, I>(&mut self, bounds: R, terms: I) -> usize
    where
        R: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let (lower, upper) = range_to_bounds(&bounds);
        let terms: Vec<_> = terms.into_iter().collect();
        for (var, _) in &terms {
            assert!(
                var.0 < self.columns.len(),
                "Row refers to unknown column {}",
                var.0
            );
        }
        self.rows.push(Row {
            lower,
            upper,
            terms,
        });
        self.rows.len() - 1
    }

    /// The number of columns
    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// The number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// The columns, in index order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The rows, in the order they were added
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The column for the given variable
    pub fn column(&self, var: Variable) -> &Column {
        &self.columns[var.0]
    }

    /// Evaluate the objective for a set of column values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(values)
            .map(|(column, value)| column.cost * value)
            .sum()
    }

    /// Evaluate the left-hand side of a row for a set of column values
    pub fn row_activity(&self, row: usize, values: &[f64]) -> f64 {
        self.rows[row]
            .terms
            .iter()
            .map(|(var, coeff)| coeff * values[var.0])
            .sum()
    }
}
