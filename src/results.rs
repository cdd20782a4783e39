//! Converts a solved capacity expansion problem into dispatch, capacities and cost accounting.
//!
//! Costs are recomputed from the technology data rather than taken from the solver's objective, so
//! the headline total is always consistent with the per-technology breakdown. Reported costs count
//! operation in statistics hours only, alongside the full annualised fixed cost of the installed
//! capacity. The cost of every hour, as minimised by the solver, is kept separately.
use crate::finance::{annualised_fixed_cost, levelised_cost, marginal_cost};
use crate::hour::{TimelineHour, iter_timeline};
use crate::model::ModelOptions;
use crate::simulation::optimisation::CapacityExpansionProblem;
use crate::simulation::optimisation::problem::Variable;
use crate::simulation::optimisation::solver::LpSolution;
use crate::technology::{TechnologyCategory, TechnologyDefinition, TechnologyID};
use crate::units::{Capacity, Dimensionless, Emissions, Energy, Money, MoneyPerEnergy};
use indexmap::IndexMap;
use serde::Serialize;

/// Operation of the system in a single hour
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyDispatch {
    /// Position on the concatenated timeline
    pub hour: usize,
    /// Timestamp from the input data
    pub timestamp: String,
    /// Weight of the owning week
    pub weight: Dimensionless,
    /// Whether the hour counts towards reported statistics
    pub include_in_stats: bool,
    /// Demand in this hour
    pub demand: Energy,
    /// Generation by each non-storage technology
    pub generation: IndexMap<TechnologyID, Energy>,
    /// Available but unused renewable output
    pub curtailment: IndexMap<TechnologyID, Energy>,
    /// Energy drawn into storage
    pub charge: Energy,
    /// Energy released from storage
    pub discharge: Energy,
    /// Stored energy at the end of the hour
    pub state_of_charge: Energy,
    /// Demand which was not met
    pub unserved: Energy,
}

/// Results for a single technology
#[derive(Debug, Clone, PartialEq)]
pub struct TechnologyResult {
    /// The technology's category
    pub category: TechnologyCategory,
    /// Installed capacity (MW, or MWh for storage)
    pub capacity: Capacity,
    /// Weighted annual generation over statistics hours (discharge for storage)
    pub generation: Energy,
    /// Annualised fixed cost of the installed capacity
    pub fixed_cost: Money,
    /// Weighted annual operating cost over statistics hours (cycling cost for storage)
    pub variable_cost: Money,
    /// Fixed plus variable cost
    pub total_cost: Money,
    /// This technology's share of the system LCOE
    pub lcoe_contribution: MoneyPerEnergy,
    /// Weighted annual curtailment over statistics hours
    pub curtailment: Energy,
    /// Weighted annual emissions over statistics hours
    pub emissions: Emissions,
}

/// System-wide totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemSummary {
    /// Total annualised system cost, including the lost-load penalty, with operating costs taken
    /// over statistics hours
    pub total_cost: Money,
    /// Total annualised system cost over every hour, as minimised by the solver
    pub objective_cost: Money,
    /// Levelised cost of served energy
    pub lcoe: MoneyPerEnergy,
    /// Weighted emissions over statistics hours
    pub emissions: Emissions,
    /// Weighted demand over statistics hours
    pub demand: Energy,
    /// Weighted demand met over statistics hours
    pub served: Energy,
    /// Weighted unserved energy over statistics hours
    pub unserved: Energy,
    /// Weighted curtailment over statistics hours
    pub curtailment: Energy,
    /// Percentage of statistics-hour demand not met by conventional generation
    pub renewable_share: Dimensionless,
    /// Weighted cost of charging storage over statistics hours
    pub storage_cycling_cost: Money,
    /// Weighted penalty for unserved energy over statistics hours
    pub lost_load_cost: Money,
}

/// The output of a single optimisation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationResult {
    /// Hour-by-hour operation, in timeline order
    pub dispatch: Vec<HourlyDispatch>,
    /// Per-technology results, sorted by technology ID
    pub technologies: IndexMap<TechnologyID, TechnologyResult>,
    /// System-wide totals
    pub summary: SystemSummary,
}

impl SimulationResult {
    /// A result with every quantity zero, for requests with no data
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Weighted annual generation by technology (the generation mix)
    pub fn generation_mix(&self) -> impl Iterator<Item = (&TechnologyID, Energy)> {
        self.technologies
            .iter()
            .map(|(id, result)| (id, result.generation))
    }
}

/// Reads solved column values, clamping solver noise on non-negative quantities
struct SolutionValues<'a>(&'a [f64]);

impl SolutionValues<'_> {
    fn get(&self, var: Variable) -> f64 {
        self.0[var.index()].max(0.0)
    }

    fn energy(&self, var: Variable) -> Energy {
        Energy(self.get(var))
    }
}

/// Accumulates per-technology quantities while walking the timeline
#[derive(Default)]
struct TechnologyTotals {
    generation: Energy,
    operating_cost: Money,
    curtailment: Energy,
    emissions: Emissions,
}

/// Extract results from a solved problem.
///
/// # Arguments
///
/// * `built` - The problem which was solved
/// * `solution` - The optimal solution
/// * `options` - The options the problem was built with
pub fn extract_results(
    built: &CapacityExpansionProblem,
    solution: &LpSolution,
    options: &ModelOptions,
) -> SimulationResult {
    let values = SolutionValues(&solution.columns);
    let variables = &built.variables;

    let capacities: IndexMap<_, _> = built
        .technologies
        .iter()
        .map(|tech| {
            let capacity = Capacity(values.get(variables.capacity(&tech.id)));
            (tech.id.clone(), capacity)
        })
        .collect();
    let mut totals: IndexMap<TechnologyID, TechnologyTotals> = built
        .technologies
        .iter()
        .map(|tech| (tech.id.clone(), TechnologyTotals::default()))
        .collect();

    let mut summary = SystemSummary::default();
    let mut conventional = Energy(0.0);
    let mut all_hours_operating_cost = Money(0.0);
    let mut dispatch = Vec::new();
    for hour in iter_timeline(built.weeks) {
        let hourly = extract_hour(built, &values, &capacities, &hour);
        let weight = hour.weight();
        let in_stats = hour.record.include_in_stats;

        for tech in &built.technologies {
            let totals = &mut totals[&tech.id];
            let (generation, operating_cost) = if tech.is_storage() {
                let cost = weight * options.storage_cycling_cost * hourly.charge;
                (hourly.discharge, cost)
            } else {
                let generation = hourly.generation[&tech.id];
                (generation, weight * marginal_cost(tech) * generation)
            };
            all_hours_operating_cost += operating_cost;

            if in_stats {
                totals.operating_cost += operating_cost;
                totals.generation += weight * generation;
                totals.emissions += weight * (tech.emission_factor * generation);
                if let Some(curtailment) = hourly.curtailment.get(&tech.id) {
                    totals.curtailment += weight * *curtailment;
                }
                if !tech.is_renewable() && !tech.is_storage() {
                    conventional += weight * generation;
                }
            }
        }

        let lost_load_cost = weight * options.value_of_lost_load * hourly.unserved;
        all_hours_operating_cost += lost_load_cost;
        if in_stats {
            summary.lost_load_cost += lost_load_cost;
            summary.demand += weight * hourly.demand;
            summary.unserved += weight * hourly.unserved;
        }

        dispatch.push(hourly);
    }

    summary.served = (summary.demand - summary.unserved).max(Energy(0.0));

    let mut technologies = IndexMap::new();
    for tech in &built.technologies {
        let result = technology_result(
            tech,
            capacities[&tech.id],
            &totals[&tech.id],
            summary.served,
        );
        summary.total_cost += result.total_cost;
        summary.objective_cost += result.fixed_cost;
        summary.emissions += result.emissions;
        summary.curtailment += result.curtailment;
        if tech.is_storage() {
            summary.storage_cycling_cost += result.variable_cost;
        }
        technologies.insert(tech.id.clone(), result);
    }
    summary.total_cost += summary.lost_load_cost;
    summary.objective_cost += all_hours_operating_cost;
    summary.lcoe = levelised_cost(summary.total_cost, summary.served);
    summary.renewable_share = renewable_share(conventional, summary.demand);

    SimulationResult {
        dispatch,
        technologies,
        summary,
    }
}

/// Read the operation of the system in one hour
fn extract_hour(
    built: &CapacityExpansionProblem,
    values: &SolutionValues,
    capacities: &IndexMap<TechnologyID, Capacity>,
    hour: &TimelineHour,
) -> HourlyDispatch {
    let h = hour.index;
    let variables = &built.variables;

    let mut generation = IndexMap::new();
    let mut curtailment = IndexMap::new();
    for tech in built.technologies.iter().filter(|tech| !tech.is_storage()) {
        let output = values.energy(variables.generation(&tech.id, h));
        if tech.is_renewable() {
            let available = tech.availability(hour.record) * capacities[&tech.id];
            let unused = (available.value() - output.value()).max(0.0);
            curtailment.insert(tech.id.clone(), Energy(unused));
        }
        generation.insert(tech.id.clone(), output);
    }

    let (charge, discharge, state_of_charge) = variables.storage().map_or_else(
        || (Energy(0.0), Energy(0.0), Energy(0.0)),
        |storage| {
            (
                values.energy(storage.charge[h]),
                values.energy(storage.discharge[h]),
                values.energy(storage.state_of_charge[h]),
            )
        },
    );

    HourlyDispatch {
        hour: h,
        timestamp: hour.record.timestamp.clone(),
        weight: hour.weight(),
        include_in_stats: hour.record.include_in_stats,
        demand: hour.record.demand,
        generation,
        curtailment,
        charge,
        discharge,
        state_of_charge,
        unserved: values.energy(variables.unserved(h)),
    }
}

fn technology_result(
    tech: &TechnologyDefinition,
    capacity: Capacity,
    totals: &TechnologyTotals,
    served: Energy,
) -> TechnologyResult {
    let fixed_cost = annualised_fixed_cost(tech) * capacity;
    let total_cost = fixed_cost + totals.operating_cost;

    TechnologyResult {
        category: tech.category,
        capacity,
        generation: totals.generation,
        fixed_cost,
        variable_cost: totals.operating_cost,
        total_cost,
        lcoe_contribution: levelised_cost(total_cost, served),
        curtailment: totals.curtailment,
        emissions: totals.emissions,
    }
}

/// The percentage of demand not met by conventional generation
fn renewable_share(conventional: Energy, demand: Energy) -> Dimensionless {
    if demand <= Energy(0.0) {
        return Dimensionless(0.0);
    }

    let share = Dimensionless(100.0) * (Dimensionless(1.0) - conventional / demand);
    Dimensionless(share.value().clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{battery, flat_week, gas, solar};
    use crate::simulation::optimisation::build_problem;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// A solution with every column set to the given value
    fn uniform_solution(built: &CapacityExpansionProblem, value: f64) -> LpSolution {
        let columns = vec![value; built.problem.num_cols()];
        let objective = built.problem.objective_value(&columns);
        LpSolution { columns, objective }
    }

    #[rstest]
    fn test_extract_results_costs(gas: TechnologyDefinition, solar: TechnologyDefinition) {
        let weeks = [flat_week(2, 10.0, 0.5, 0.0, 3.0)];
        let options = ModelOptions::default();
        let built = build_problem(vec![&gas, &solar], &weeks, None, &options);
        let solution = uniform_solution(&built, 1.0);
        let result = extract_results(&built, &solution, &options);

        // Recomputed total agrees with the objective, as every hour counts towards statistics
        assert_approx_eq!(
            f64,
            result.summary.objective_cost.value(),
            solution.objective,
            epsilon = 1e-6
        );
        assert_approx_eq!(Money, result.summary.total_cost, result.summary.objective_cost);

        let gas_result = &result.technologies[&gas.id];
        assert_eq!(gas_result.capacity, Capacity(1.0));
        assert_approx_eq!(Energy, gas_result.generation, Energy(6.0));
        assert_approx_eq!(Money, gas_result.variable_cost, Money(6.0 * 54.0));
        assert_approx_eq!(Emissions, gas_result.emissions, Emissions(6.0 * 0.4));

        assert_approx_eq!(Energy, result.summary.demand, Energy(60.0));
        assert_approx_eq!(Energy, result.summary.unserved, Energy(6.0));
        assert_approx_eq!(Energy, result.summary.served, Energy(54.0));
        assert_approx_eq!(
            MoneyPerEnergy,
            result.summary.lcoe,
            result.summary.total_cost / Energy(54.0)
        );
    }

    #[rstest]
    fn test_extract_results_excludes_non_stats_hours(
        gas: TechnologyDefinition,
        solar: TechnologyDefinition,
    ) {
        let mut extreme = flat_week(2, 40.0, 0.5, 0.0, 2.0);
        for record in &mut extreme.hours {
            record.include_in_stats = false;
        }
        let weeks = [flat_week(2, 10.0, 0.5, 0.0, 3.0), extreme];
        let options = ModelOptions::default();
        let built = build_problem(vec![&gas, &solar], &weeks, None, &options);

        let mut solution = uniform_solution(&built, 1.0);
        solution.columns[built.variables.capacity(&solar.id).index()] = 4.0;
        solution.objective = built.problem.objective_value(&solution.columns);
        let result = extract_results(&built, &solution, &options);
        let summary = &result.summary;

        // Weight 3 over 2 hours in the statistics week
        let value_of_lost_load = options.value_of_lost_load.value();
        assert_approx_eq!(Energy, summary.demand, Energy(60.0));
        assert_approx_eq!(Energy, summary.unserved, Energy(6.0));
        assert_approx_eq!(Energy, summary.served, Energy(54.0));
        assert_approx_eq!(Emissions, summary.emissions, Emissions(6.0 * 0.4));
        assert_approx_eq!(Energy, summary.curtailment, Energy(6.0));
        assert_approx_eq!(Dimensionless, summary.renewable_share, Dimensionless(90.0));
        assert_eq!(summary.storage_cycling_cost, Money(0.0));
        assert_approx_eq!(Money, summary.lost_load_cost, Money(6.0 * value_of_lost_load));

        let gas_result = &result.technologies[&gas.id];
        let solar_result = &result.technologies[&solar.id];
        assert_approx_eq!(Energy, gas_result.generation, Energy(6.0));
        assert_approx_eq!(Money, gas_result.variable_cost, Money(6.0 * 54.0));
        assert_approx_eq!(Energy, solar_result.curtailment, Energy(6.0));

        let fixed_cost = annualised_fixed_cost(&gas) * Capacity(1.0)
            + annualised_fixed_cost(&solar) * Capacity(4.0);
        assert_approx_eq!(Money, gas_result.fixed_cost + solar_result.fixed_cost, fixed_cost);
        assert_approx_eq!(
            f64,
            summary.total_cost.value(),
            (fixed_cost + Money(6.0 * 54.0 + 6.0 * value_of_lost_load)).value(),
            epsilon = 1e-3
        );
        assert_approx_eq!(
            MoneyPerEnergy,
            summary.lcoe,
            summary.total_cost / Energy(54.0)
        );

        // The non-statistics week adds 4 hours of gas and unserved energy to the objective
        assert_approx_eq!(
            f64,
            summary.objective_cost.value(),
            (fixed_cost + Money(10.0 * 54.0 + 10.0 * value_of_lost_load)).value(),
            epsilon = 1e-3
        );
        assert_approx_eq!(
            f64,
            summary.objective_cost.value(),
            solution.objective,
            epsilon = 1e-3
        );
    }

    #[rstest]
    fn test_extract_results_curtailment_and_clamping(solar: TechnologyDefinition) {
        let weeks = [flat_week(1, 10.0, 0.5, 0.0, 1.0)];
        let options = ModelOptions::default();
        let built = build_problem(vec![&solar], &weeks, None, &options);

        let mut solution = uniform_solution(&built, 0.0);
        solution.columns[built.variables.capacity(&solar.id).index()] = 20.0;
        solution.columns[built.variables.generation(&solar.id, 0).index()] = 4.0;
        solution.columns[built.variables.unserved(0).index()] = -1e-9;
        let result = extract_results(&built, &solution, &options);

        let hour = &result.dispatch[0];
        assert_eq!(hour.curtailment[&solar.id], Energy(6.0));
        assert_eq!(hour.unserved, Energy(0.0));
        assert_eq!(result.summary.curtailment, Energy(6.0));
        assert_eq!(result.summary.renewable_share, Dimensionless(100.0));
    }

    #[rstest]
    fn test_extract_results_storage(battery: TechnologyDefinition) {
        let weeks = [flat_week(2, 10.0, 0.0, 0.0, 2.0)];
        let options = ModelOptions::default();
        let built = build_problem(vec![&battery], &weeks, None, &options);
        let result = extract_results(&built, &uniform_solution(&built, 1.0), &options);

        let battery_result = &result.technologies[&battery.id];
        assert_approx_eq!(Energy, battery_result.generation, Energy(4.0));
        assert_approx_eq!(
            Money,
            result.summary.storage_cycling_cost,
            Money(4.0 * options.storage_cycling_cost.value())
        );
        assert!(result.dispatch[0].generation.is_empty());
        assert_eq!(result.dispatch[1].state_of_charge, Energy(1.0));
    }

    #[test]
    fn test_renewable_share() {
        assert_eq!(
            renewable_share(Energy(25.0), Energy(100.0)),
            Dimensionless(75.0)
        );
        assert_eq!(renewable_share(Energy(0.0), Energy(0.0)), Dimensionless(0.0));
        assert_eq!(
            renewable_share(Energy(101.0), Energy(100.0)),
            Dimensionless(0.0)
        );
    }

    #[test]
    fn test_zeroed() {
        let result = SimulationResult::zeroed();
        assert!(result.dispatch.is_empty());
        assert_eq!(result.summary.total_cost, Money(0.0));
        assert_eq!(result.generation_mix().count(), 0);
    }
}
