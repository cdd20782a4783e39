//! Code for building the capacity expansion problem.
//!
//! The problem jointly chooses how much capacity to build for each technology and how to dispatch
//! it in every hour of every representative week, minimising annualised fixed costs plus the
//! weighted cost of operation and of unserved demand.
use crate::finance::{annualised_fixed_cost, marginal_cost};
use crate::hour::{RepresentativeWeek, TimelineHour, iter_timeline, timeline_len};
use crate::model::ModelOptions;
use crate::technology::{TechnologyDefinition, TechnologyID};
use crate::units::Dimensionless;
use indexmap::IndexMap;
use log::debug;

pub mod constraints;
use constraints::{ConstraintKeys, add_constraints};
pub mod problem;
use problem::{LpProblem, Variable};
pub mod solver;

/// Variables describing the operation of the storage technology
pub struct StorageVariables {
    /// The storage technology
    pub technology: TechnologyID,
    /// Energy capacity (MWh)
    pub capacity: Variable,
    /// Energy charged in each hour
    pub charge: Vec<Variable>,
    /// Energy discharged in each hour
    pub discharge: Vec<Variable>,
    /// Stored energy at the end of each hour
    pub state_of_charge: Vec<Variable>,
}

/// A map for easy lookup of variables in the problem.
///
/// We use this data structure for two things:
///
/// 1. In order to define constraints for the optimisation
/// 2. To keep track of what each variable corresponds to, for when we are reading the results of
///    the optimisation.
#[derive(Default)]
pub struct VariableMap {
    capacity: IndexMap<TechnologyID, Variable>,
    generation: IndexMap<TechnologyID, Vec<Variable>>,
    storage: Option<StorageVariables>,
    unserved: Vec<Variable>,
}

impl VariableMap {
    /// Get the capacity variable for a technology
    pub fn capacity(&self, technology_id: &TechnologyID) -> Variable {
        *self
            .capacity
            .get(technology_id)
            .expect("No capacity variable found for given technology")
    }

    /// Get the generation variable for a non-storage technology in the given hour
    pub fn generation(&self, technology_id: &TechnologyID, hour: usize) -> Variable {
        self.generation
            .get(technology_id)
            .expect("No generation variables found for given technology")[hour]
    }

    /// Iterate over the generation variables of every non-storage technology in the given hour
    pub fn iter_generation(&self, hour: usize) -> impl Iterator<Item = (&TechnologyID, Variable)> {
        self.generation.iter().map(move |(id, vars)| (id, vars[hour]))
    }

    /// The storage variables, if a storage technology is modelled
    pub fn storage(&self) -> Option<&StorageVariables> {
        self.storage.as_ref()
    }

    /// Get the unserved energy variable for the given hour
    pub fn unserved(&self, hour: usize) -> Variable {
        self.unserved[hour]
    }
}

/// A fully built problem along with what is needed to interpret its solution
pub struct CapacityExpansionProblem<'a> {
    /// The linear program
    pub problem: LpProblem,
    /// Lookup for the problem's variables
    pub variables: VariableMap,
    /// Which rows correspond to which constraints
    pub constraint_keys: ConstraintKeys,
    /// The technologies in the problem, sorted by ID
    pub technologies: Vec<&'a TechnologyDefinition>,
    /// The representative weeks, in timeline order
    pub weeks: &'a [RepresentativeWeek],
}

/// Build the capacity expansion problem.
///
/// # Arguments
///
/// * `technologies` - The technologies to model. At most one may be a storage technology.
/// * `weeks` - The representative weeks, in order
/// * `min_renewable_share` - Optional minimum share of demand (in percent) not met by
///   conventional generation
/// * `options` - Options controlling the problem formulation
///
/// # Returns
///
/// The problem, ready to be handed to a solver.
pub fn build_problem<'a>(
    technologies: Vec<&'a TechnologyDefinition>,
    weeks: &'a [RepresentativeWeek],
    min_renewable_share: Option<Dimensionless>,
    options: &ModelOptions,
) -> CapacityExpansionProblem<'a> {
    assert!(
        technologies.iter().filter(|tech| tech.is_storage()).count() <= 1,
        "At most one storage technology can be modelled"
    );

    let mut problem = LpProblem::default();
    let variables = add_variables(&mut problem, &technologies, weeks, options);
    let constraint_keys = add_constraints(
        &mut problem,
        &variables,
        &technologies,
        weeks,
        min_renewable_share,
        options,
    );

    debug!(
        "Built problem for {} technologies over {} hours: {} columns, {} rows",
        technologies.len(),
        timeline_len(weeks),
        problem.num_cols(),
        problem.num_rows()
    );

    CapacityExpansionProblem {
        problem,
        variables,
        constraint_keys,
        technologies,
        weeks,
    }
}

/// Add variables to the optimisation problem.
///
/// Columns are added in a fixed order: capacities, then generation by technology, then storage
/// operation, then unserved energy.
fn add_variables(
    problem: &mut LpProblem,
    technologies: &[&TechnologyDefinition],
    weeks: &[RepresentativeWeek],
    options: &ModelOptions,
) -> VariableMap {
    let mut variables = VariableMap::default();

    for tech in technologies {
        let var = problem.add_column(annualised_fixed_cost(tech).value(), 0.0..);
        let existing = variables.capacity.insert(tech.id.clone(), var).is_some();
        assert!(!existing, "Duplicate entry for technology {}", tech.id);
    }

    for tech in technologies.iter().filter(|tech| !tech.is_storage()) {
        let vars = iter_timeline(weeks)
            .map(|hour| add_generation_column(problem, tech, &hour, options))
            .collect();
        variables.generation.insert(tech.id.clone(), vars);
    }

    if let Some(tech) = technologies.iter().find(|tech| tech.is_storage()) {
        variables.storage = Some(add_storage_columns(
            problem,
            tech,
            variables.capacity(&tech.id),
            weeks,
            options,
        ));
    }

    variables.unserved = iter_timeline(weeks)
        .map(|hour| {
            let coeff = hour.weight() * options.value_of_lost_load;
            problem.add_column(coeff.value(), 0.0..)
        })
        .collect();

    variables
}

/// Add the generation column for a technology in one hour.
///
/// Renewable output is fixed at zero when the resource is effectively unavailable.
fn add_generation_column(
    problem: &mut LpProblem,
    tech: &TechnologyDefinition,
    hour: &TimelineHour,
    options: &ModelOptions,
) -> Variable {
    let coeff = (hour.weight() * marginal_cost(tech)).value();
    if tech.is_renewable() && tech.availability(hour.record) < options.availability_threshold {
        problem.add_column(coeff, 0.0..=0.0)
    } else {
        problem.add_column(coeff, 0.0..)
    }
}

fn add_storage_columns(
    problem: &mut LpProblem,
    tech: &TechnologyDefinition,
    capacity: Variable,
    weeks: &[RepresentativeWeek],
    options: &ModelOptions,
) -> StorageVariables {
    let charge = iter_timeline(weeks)
        .map(|hour| {
            let coeff = hour.weight() * options.storage_cycling_cost;
            problem.add_column(coeff.value(), 0.0..)
        })
        .collect();
    let discharge = iter_timeline(weeks)
        .map(|_| problem.add_column(0.0, 0.0..))
        .collect();
    let state_of_charge = iter_timeline(weeks)
        .map(|_| problem.add_column(0.0, 0.0..))
        .collect();

    StorageVariables {
        technology: tech.id.clone(),
        capacity,
        charge,
        discharge,
        state_of_charge,
    }
}
