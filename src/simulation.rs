//! Functionality for running a capacity expansion optimisation.
use crate::hour::{RepresentativeWeek, timeline_len};
use crate::model::{Model, ModelOptions};
use crate::output::DataWriter;
use crate::results::{SimulationResult, extract_results};
use crate::technology::TechnologyCatalog;
use crate::units::Dimensionless;
use anyhow::Result;
use log::{debug, error, info, warn};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Once;
use thiserror::Error;

pub mod optimisation;
use optimisation::build_problem;
use optimisation::solver::{LpSolver, SOLVER, SolveError, SolverStatus};

/// Everything needed for a single optimisation run.
///
/// Requests own their data, so they can be built by a caller, modified (e.g. by toggling
/// technologies) and handed to another thread.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    /// The technologies which may be built. Disabled technologies are ignored.
    pub technologies: TechnologyCatalog,
    /// Representative weeks, in order
    pub weeks: Vec<RepresentativeWeek>,
    /// Optional minimum renewable share, in percent
    pub min_renewable_share: Option<Dimensionless>,
    /// Options for building the problem
    pub options: ModelOptions,
}

/// Ways in which a simulation request can fail
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    /// The shared solver has not been initialised yet
    #[error("Solver is not ready; the request can be retried once it has been initialised")]
    NotReady,
    /// The solver finished without an optimal solution
    #[error("No optimal solution found: {0}")]
    NonOptimal(SolverStatus),
    /// The solver rejected the problem
    #[error("Solver failed: {0}")]
    Solver(String),
    /// A defect in building the problem or reading its solution
    #[error("Internal error during optimisation: {0}")]
    Internal(String),
}

impl SimulationError {
    /// Whether the same request may succeed if retried later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady)
    }
}

impl From<SolveError> for SimulationError {
    fn from(err: SolveError) -> Self {
        match err {
            SolveError::NotReady => Self::NotReady,
            SolveError::NonOptimal(status) => Self::NonOptimal(status),
            SolveError::Failed(msg) => Self::Solver(msg),
        }
    }
}

/// Get a printable message from a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown error".to_string()
    }
}

thread_local! {
    /// Whether this thread is running code whose panics are caught as internal errors
    static CATCHING_PANICS: Cell<bool> = const { Cell::new(false) };
}

static INSTALL_PANIC_HOOK: Once = Once::new();

/// Run `f`, turning a panic into an error message.
///
/// Panics on this thread are logged instead of being passed to the process-wide panic hook (e.g.
/// human-panic's crash report). Other threads are unaffected.
fn catch_internal_errors<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    INSTALL_PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CATCHING_PANICS.with(Cell::get) {
                debug!("Caught panic: {info}");
            } else {
                previous(info);
            }
        }));
    });

    let was_catching = CATCHING_PANICS.with(|flag| flag.replace(true));
    let outcome = catch_unwind(AssertUnwindSafe(f));
    CATCHING_PANICS.with(|flag| flag.set(was_catching));

    outcome.map_err(|payload| panic_message(payload.as_ref()))
}

/// Run a single optimisation.
///
/// Requests with no hours give a zeroed result. Panics raised while building the problem or
/// reading its solution are caught and returned as [`SimulationError::Internal`], so the calling
/// process can carry on serving other requests.
///
/// # Arguments
///
/// * `request` - The data for this run
/// * `solver` - The solver to use
pub fn run_simulation<S>(
    request: &SimulationRequest,
    solver: &S,
) -> Result<SimulationResult, SimulationError>
where
    S: LpSolver + ?Sized,
{
    if timeline_len(&request.weeks) == 0 {
        warn!("No hourly data supplied; returning an empty result");
        return Ok(SimulationResult::zeroed());
    }

    let outcome = catch_internal_errors(|| -> Result<_, SolveError> {
        let technologies = request.technologies.modelled_technologies();
        let built = build_problem(
            technologies,
            &request.weeks,
            request.min_renewable_share,
            &request.options,
        );
        let solution = solver.solve(&built.problem)?;
        debug!("Solver objective: {}", solution.objective);
        Ok(extract_results(&built, &solution, &request.options))
    });

    match outcome {
        Ok(result) => result.map_err(SimulationError::from),
        Err(msg) => {
            error!("Optimisation failed with an internal error: {msg}");
            Err(SimulationError::Internal(msg))
        }
    }
}

/// Run the model and write the results to disk.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
pub fn run(model: &Model, output_path: &Path) -> Result<SimulationResult> {
    let solver = SOLVER.initialise(model.parameters.solver.clone());
    let request = model.to_request();

    info!("Running optimisation...");
    let result = run_simulation(&request, solver)?;
    info!(
        "Total cost: {:.2}; LCOE: {:.2}; unserved energy: {:.2}",
        result.summary.total_cost.value(),
        result.summary.lcoe.value(),
        result.summary.unserved.value()
    );

    let mut writer = DataWriter::create(output_path)?;
    writer.write_results(&result)?;
    writer.flush()?;

    Ok(result)
}
