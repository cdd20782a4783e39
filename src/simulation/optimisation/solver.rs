//! Adapters which hand an [`LpProblem`] to an external solver.
use super::problem::LpProblem;
use crate::log::LOG_LEVEL_ENV_VAR;
use highs::{HighsModelStatus, RowProblem, Sense};
use log::debug;
use serde::Deserialize;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// The primal solution of a successfully solved problem
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    /// The value of each column, indexed by [`Variable::index`](super::problem::Variable::index)
    pub columns: Vec<f64>,
    /// The objective value at the solution
    pub objective: f64,
}

/// Why a solve did not produce an optimal solution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverStatus {
    /// No feasible point exists
    Infeasible,
    /// The objective can be decreased without limit
    Unbounded,
    /// The solver stopped at its time limit
    TimeLimit,
    /// Any other non-optimal status reported by the solver
    Other(String),
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infeasible => write!(f, "infeasible"),
            Self::Unbounded => write!(f, "unbounded"),
            Self::TimeLimit => write!(f, "time limit reached"),
            Self::Other(status) => write!(f, "{status}"),
        }
    }
}

/// Errors raised when solving a problem
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    /// The solver has not been initialised yet; the request may be retried later
    #[error("Solver is not ready")]
    NotReady,
    /// The solver finished without an optimal solution
    #[error("Could not solve: {0}")]
    NonOptimal(SolverStatus),
    /// The solver rejected the problem or failed internally
    #[error("Solver failed: {0}")]
    Failed(String),
}

/// Something which can solve a linear minimisation problem
pub trait LpSolver {
    /// Solve the problem, returning the optimal column values
    fn solve(&self, problem: &LpProblem) -> Result<LpSolution, SolveError>;
}

/// Options passed on to the solver
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SolverOptions {
    /// Time limit for a single solve, in seconds
    #[serde(default)]
    pub time_limit: Option<f64>,
    /// Number of threads the solver may use
    #[serde(default)]
    pub threads: Option<u32>,
    /// Whether to let the solver print its own progress to the console
    #[serde(default)]
    pub log_to_console: bool,
}

/// Solves problems with HiGHS.
///
/// The solver only holds options; a fresh HiGHS model is created for each call, so it can be
/// shared between threads.
#[derive(Debug, Clone, Default)]
pub struct HighsSolver {
    options: SolverOptions,
}

impl HighsSolver {
    /// Create a new solver with the given options
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    /// Apply our options to a HiGHS model
    fn configure(&self, model: &mut highs::Model) {
        // Skip solver output if logging is disabled (e.g. when running tests)
        let logging_off = std::env::var(LOG_LEVEL_ENV_VAR)
            .is_ok_and(|level| level.eq_ignore_ascii_case("off"));
        let verbose = self.options.log_to_console && !logging_off;
        model.set_option("output_flag", verbose);
        model.set_option("log_to_console", verbose);

        if let Some(time_limit) = self.options.time_limit {
            model.set_option("time_limit", time_limit);
        }
        if let Some(threads) = self.options.threads {
            model.set_option("threads", threads as i32);
        }
    }
}

/// Convert a HiGHS status into our own
fn convert_status(status: HighsModelStatus) -> SolverStatus {
    match status {
        HighsModelStatus::Infeasible => SolverStatus::Infeasible,
        HighsModelStatus::Unbounded => SolverStatus::Unbounded,
        HighsModelStatus::ReachedTimeLimit => SolverStatus::TimeLimit,
        status => SolverStatus::Other(format!("{status:?}")),
    }
}

impl LpSolver for HighsSolver {
    fn solve(&self, problem: &LpProblem) -> Result<LpSolution, SolveError> {
        let mut highs_problem = RowProblem::default();
        let cols: Vec<_> = problem
            .columns()
            .iter()
            .map(|column| highs_problem.add_column(column.cost, column.lower..=column.upper))
            .collect();
        for row in problem.rows() {
            highs_problem.add_row(
                row.lower..=row.upper,
                row.terms.iter().map(|(var, coeff)| (cols[var.index()], *coeff)),
            );
        }

        debug!(
            "Solving problem with {} columns and {} rows",
            problem.num_cols(),
            problem.num_rows()
        );

        let mut model = highs_problem.optimise(Sense::Minimise);
        self.configure(&mut model);

        let solved = model
            .try_solve()
            .map_err(|status| SolveError::Failed(format!("{status:?}")))?;
        match solved.status() {
            HighsModelStatus::Optimal => {
                let columns = solved.get_solution().columns().to_vec();
                let objective = problem.objective_value(&columns);
                Ok(LpSolution { columns, objective })
            }
            status => Err(SolveError::NonOptimal(convert_status(status))),
        }
    }
}

/// A lazily initialised solver shared by every request in the process.
///
/// It holds no per-request state. Requests made before [`SharedSolver::initialise`] fail with
/// [`SolveError::NotReady`].
pub struct SharedSolver {
    solver: OnceLock<HighsSolver>,
}

impl SharedSolver {
    /// Create an uninitialised solver
    pub const fn new() -> Self {
        Self {
            solver: OnceLock::new(),
        }
    }

    /// Initialise the solver. Later calls keep the options from the first call.
    pub fn initialise(&self, options: SolverOptions) -> &HighsSolver {
        self.solver.get_or_init(|| HighsSolver::new(options))
    }

    /// Whether the solver has been initialised
    pub fn is_ready(&self) -> bool {
        self.solver.get().is_some()
    }
}

impl Default for SharedSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LpSolver for SharedSolver {
    fn solve(&self, problem: &LpProblem) -> Result<LpSolution, SolveError> {
        self.solver.get().ok_or(SolveError::NotReady)?.solve(problem)
    }
}

/// The process-wide solver
pub static SOLVER: SharedSolver = SharedSolver::new();
