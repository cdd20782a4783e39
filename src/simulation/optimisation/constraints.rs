//! Code for adding constraints to the capacity expansion problem.
use super::VariableMap;
use super::problem::LpProblem;
use crate::hour::{RepresentativeWeek, iter_timeline};
use crate::model::{ModelOptions, StorageCycle};
use crate::technology::{TechnologyDefinition, TechnologyID};
use crate::units::{Dimensionless, Energy};
use log::warn;

/// Keys for a block of consecutive constraint rows, along with the row offset in the problem
#[derive(Debug, Clone, PartialEq)]
pub struct KeysWithOffset<T> {
    offset: usize,
    keys: Vec<T>,
}

impl<T> KeysWithOffset<T> {
    /// Iterate over the keys along with the index of the row each one refers to
    pub fn iter_rows(&self) -> impl Iterator<Item = (&T, usize)> {
        self.keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key, self.offset + i))
    }

    /// The number of rows in the block
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the block is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Indicates the timeline hour covered by each energy balance constraint
pub type BalanceKeys = KeysWithOffset<usize>;

/// Indicates the technology and timeline hour covered by each capacity constraint
pub type CapacityKeys = KeysWithOffset<(TechnologyID, usize)>;

/// The keys for different constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintKeys {
    /// Keys for hourly energy balance constraints
    pub balance_keys: BalanceKeys,
    /// Keys for constraints linking generation to built capacity
    pub capacity_keys: CapacityKeys,
    /// The row for the renewable share policy, if one was added
    pub renewable_share_row: Option<usize>,
}

/// Add all constraints to the problem.
///
/// # Arguments
///
/// * `problem` - The optimisation problem
/// * `variables` - The variables in the problem
/// * `technologies` - The modelled technologies
/// * `weeks` - The representative weeks
/// * `min_renewable_share` - Optional renewable share policy, in percent
/// * `options` - Options controlling the formulation
pub fn add_constraints(
    problem: &mut LpProblem,
    variables: &VariableMap,
    technologies: &[&TechnologyDefinition],
    weeks: &[RepresentativeWeek],
    min_renewable_share: Option<Dimensionless>,
    options: &ModelOptions,
) -> ConstraintKeys {
    let balance_keys = add_balance_constraints(problem, variables, weeks);
    let capacity_keys =
        add_capacity_constraints(problem, variables, technologies, weeks, options);

    if let Some(tech) = technologies.iter().find(|tech| tech.is_storage()) {
        add_storage_constraints(problem, variables, tech, weeks, options.storage_cycle);
    }

    add_fixed_capacity_constraints(problem, variables, technologies);

    let renewable_share_row = min_renewable_share.and_then(|share| {
        add_renewable_share_constraint(problem, variables, technologies, weeks, share)
    });

    ConstraintKeys {
        balance_keys,
        capacity_keys,
        renewable_share_row,
    }
}

/// Add hourly energy balance constraints.
///
/// In every hour, generation plus storage discharge plus unserved energy, less storage charge, must
/// equal demand.
fn add_balance_constraints(
    problem: &mut LpProblem,
    variables: &VariableMap,
    weeks: &[RepresentativeWeek],
) -> BalanceKeys {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = problem.num_rows();

    let mut keys = Vec::new();
    for hour in iter_timeline(weeks) {
        let h = hour.index;
        let mut terms: Vec<_> = variables
            .iter_generation(h)
            .map(|(_, var)| (var, 1.0))
            .collect();
        if let Some(storage) = variables.storage() {
            terms.push((storage.discharge[h], 1.0));
            terms.push((storage.charge[h], -1.0));
        }
        terms.push((variables.unserved(h), 1.0));

        let demand = hour.record.demand.value();
        problem.add_row(demand..=demand, terms);
        keys.push(h);
    }

    BalanceKeys { offset, keys }
}

/// Add constraints limiting generation to the available share of built capacity.
///
/// Renewable hours whose generation column is already fixed at zero get no row.
fn add_capacity_constraints(
    problem: &mut LpProblem,
    variables: &VariableMap,
    technologies: &[&TechnologyDefinition],
    weeks: &[RepresentativeWeek],
    options: &ModelOptions,
) -> CapacityKeys {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = problem.num_rows();

    let mut keys = Vec::new();
    for tech in technologies.iter().filter(|tech| !tech.is_storage()) {
        let capacity = variables.capacity(&tech.id);
        for hour in iter_timeline(weeks) {
            let availability = tech.availability(hour.record);
            if tech.is_renewable() && availability < options.availability_threshold {
                continue;
            }

            let generation = variables.generation(&tech.id, hour.index);
            problem.add_row(..=0.0, [(generation, 1.0), (capacity, -availability.value())]);
            keys.push((tech.id.clone(), hour.index));
        }
    }

    CapacityKeys { offset, keys }
}

/// Add power, energy and state-of-charge constraints for the storage technology.
///
/// The capacity variable is energy (MWh) and power is limited to one full charge or discharge per
/// hour.
fn add_storage_constraints(
    problem: &mut LpProblem,
    variables: &VariableMap,
    tech: &TechnologyDefinition,
    weeks: &[RepresentativeWeek],
    cycle: StorageCycle,
) {
    let Some(storage) = variables.storage() else {
        return;
    };
    let energy = storage.capacity;
    let efficiency = tech.efficiency.value();

    for hour in iter_timeline(weeks) {
        let h = hour.index;
        let charge = storage.charge[h];
        let discharge = storage.discharge[h];
        let soc = storage.state_of_charge[h];

        problem.add_row(..=0.0, [(charge, 1.0), (energy, -1.0)]);
        problem.add_row(..=0.0, [(discharge, 1.0), (energy, -1.0)]);
        problem.add_row(..=0.0, [(soc, 1.0), (energy, -1.0)]);

        // soc[h] = soc[h - 1] + efficiency * charge[h] - discharge[h]
        let previous = if hour.is_week_start() {
            match cycle {
                StorageCycle::Reset => None,
                StorageCycle::Cyclic => Some(hour.week_end),
            }
        } else {
            Some(h - 1)
        };

        let mut terms = vec![(charge, -efficiency), (discharge, 1.0)];
        match previous {
            // A one-hour cyclic week carries its own charge over, so the soc terms cancel
            Some(prev) if prev == h => {}
            Some(prev) => {
                terms.push((soc, 1.0));
                terms.push((storage.state_of_charge[prev], -1.0));
            }
            None => terms.push((soc, 1.0)),
        }
        problem.add_row(0.0..=0.0, terms);
    }
}

/// Pin the capacity of technologies with a fixed capacity
fn add_fixed_capacity_constraints(
    problem: &mut LpProblem,
    variables: &VariableMap,
    technologies: &[&TechnologyDefinition],
) {
    for tech in technologies {
        if let Some(capacity) = tech.fixed_model_capacity() {
            let capacity = capacity.value();
            problem.add_row(capacity..=capacity, [(variables.capacity(&tech.id), 1.0)]);
        }
    }
}

/// Limit weighted conventional generation over the statistics hours.
///
/// Conventional generation may supply at most `(1 - share / 100)` of weighted demand, so the rest
/// must come from renewables, storage or unserved energy. Returns the row index, or `None` if the
/// constraint would be empty.
fn add_renewable_share_constraint(
    problem: &mut LpProblem,
    variables: &VariableMap,
    technologies: &[&TechnologyDefinition],
    weeks: &[RepresentativeWeek],
    share: Dimensionless,
) -> Option<usize> {
    if share <= Dimensionless(0.0) {
        return None;
    }

    let mut terms = Vec::new();
    let mut demand = Energy(0.0);
    for hour in iter_timeline(weeks).filter(|hour| hour.record.include_in_stats) {
        demand += hour.weight() * hour.record.demand;
        for tech in technologies
            .iter()
            .filter(|tech| !tech.is_renewable() && !tech.is_storage())
        {
            terms.push((
                variables.generation(&tech.id, hour.index),
                hour.weight().value(),
            ));
        }
    }

    if terms.is_empty() {
        warn!(
            "Renewable share of {}% requested but no conventional generation is included in statistics hours",
            share.value()
        );
        return None;
    }

    let limit = (Dimensionless(1.0) - share / Dimensionless(100.0)) * demand;
    Some(problem.add_row(..=limit.value(), terms))
}

#[cfg(test)]
mod tests {
    use super::super::build_problem;
    use super::*;
    use crate::fixture::{battery, flat_week, gas, solar, solar_week};
    use crate::hour::HourlyRecord;
    use crate::units::Capacity;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_balance_constraints(
        gas: TechnologyDefinition,
        solar: TechnologyDefinition,
        battery: TechnologyDefinition,
    ) {
        let weeks = [flat_week(4, 100.0, 0.5, 0.5, 1.0)];
        let options = ModelOptions::default();
        let built = build_problem(vec![&battery, &gas, &solar], &weeks, None, &options);

        let keys = &built.constraint_keys.balance_keys;
        assert_eq!(keys.len(), 4);
        for (h, row) in keys.iter_rows() {
            let row = &built.problem.rows()[row];
            assert_eq!(row.lower, 100.0);
            assert_eq!(row.upper, 100.0);

            let storage = built.variables.storage().unwrap();
            assert!(row.terms.contains(&(storage.charge[*h], -1.0)));
            assert!(row.terms.contains(&(storage.discharge[*h], 1.0)));
            assert!(row.terms.contains(&(built.variables.unserved(*h), 1.0)));
            assert_eq!(row.terms.len(), 5);
        }
    }

    #[rstest]
    fn test_capacity_constraints_skip_unavailable_hours(
        gas: TechnologyDefinition,
        solar: TechnologyDefinition,
    ) {
        // Sun only in the second hour
        let mut week = flat_week(2, 10.0, 0.0, 0.0, 1.0);
        week.hours[1] = HourlyRecord {
            solar: Dimensionless(0.6),
            ..week.hours[1].clone()
        };
        let weeks = [week];
        let built = build_problem(vec![&gas, &solar], &weeks, None, &ModelOptions::default());

        let keys: Vec<_> = built
            .constraint_keys
            .capacity_keys
            .iter_rows()
            .map(|(key, _)| key.clone())
            .collect();
        assert_eq!(
            keys,
            [
                (TechnologyID::from("gas"), 0),
                (TechnologyID::from("gas"), 1),
                (TechnologyID::from("solar"), 1)
            ]
        );

        let (_, row) = built.constraint_keys.capacity_keys.iter_rows().last().unwrap();
        let capacity = built.variables.capacity(&solar.id);
        assert!(built.problem.rows()[row].terms.contains(&(capacity, -0.6)));
    }

    #[rstest]
    fn test_capacity_constraints_daylight_only(
        gas: TechnologyDefinition,
        solar: TechnologyDefinition,
        solar_week: RepresentativeWeek,
    ) {
        let weeks = [solar_week];
        let built = build_problem(vec![&gas, &solar], &weeks, None, &ModelOptions::default());

        let solar_rows = built
            .constraint_keys
            .capacity_keys
            .iter_rows()
            .filter(|((id, _), _)| *id == solar.id)
            .count();
        assert_eq!(solar_rows, 7 * 8);
        assert_eq!(built.constraint_keys.capacity_keys.len(), 168 + 7 * 8);
    }

    #[rstest]
    #[case(StorageCycle::Reset, 3)]
    #[case(StorageCycle::Cyclic, 4)]
    fn test_storage_dynamics(
        battery: TechnologyDefinition,
        #[case] cycle: StorageCycle,
        #[case] first_hour_terms: usize,
    ) {
        let weeks = [flat_week(3, 10.0, 0.0, 0.0, 1.0)];
        let options = ModelOptions {
            storage_cycle: cycle,
            ..ModelOptions::default()
        };
        let built = build_problem(vec![&battery], &weeks, None, &options);

        // Three limit rows then one dynamics row per hour, after the balance rows
        let first_dynamics = &built.problem.rows()[weeks[0].hours.len() + 3];
        assert_eq!(first_dynamics.terms.len(), first_hour_terms);
        let storage = built.variables.storage().unwrap();
        assert!(first_dynamics.terms.contains(&(storage.charge[0], -0.9)));
        if cycle == StorageCycle::Cyclic {
            assert!(
                first_dynamics
                    .terms
                    .contains(&(storage.state_of_charge[2], -1.0))
            );
        }
    }

    #[rstest]
    fn test_fixed_capacity_constraints(
        mut gas: TechnologyDefinition,
        mut battery: TechnologyDefinition,
    ) {
        gas.fixed_capacity = Some(Capacity(50.0));
        battery.fixed_capacity = Some(Capacity(10.0));
        let weeks = [flat_week(1, 10.0, 0.0, 0.0, 1.0)];
        let built = build_problem(vec![&battery, &gas], &weeks, None, &ModelOptions::default());

        let pinned: Vec<_> = built
            .problem
            .rows()
            .iter()
            .filter(|row| row.terms.len() == 1 && row.lower == row.upper)
            .map(|row| (row.terms[0].0, row.lower))
            .collect();
        assert_eq!(
            pinned,
            [
                (built.variables.capacity(&battery.id), 40.0),
                (built.variables.capacity(&gas.id), 50.0)
            ]
        );
    }

    #[rstest]
    fn test_renewable_share_constraint(gas: TechnologyDefinition, solar: TechnologyDefinition) {
        let mut weeks = vec![
            flat_week(2, 100.0, 0.5, 0.0, 10.0),
            flat_week(1, 300.0, 0.5, 0.0, 1.0),
        ];
        weeks[1].hours[0].include_in_stats = false;
        let built = build_problem(
            vec![&gas, &solar],
            &weeks,
            Some(Dimensionless(80.0)),
            &ModelOptions::default(),
        );

        let row = built.constraint_keys.renewable_share_row.unwrap();
        let row = &built.problem.rows()[row];

        // Only the two statistics hours of the first week count
        assert_approx_eq!(f64, row.upper, 0.2 * 2000.0, epsilon = 1e-9);
        assert_eq!(
            row.terms,
            [
                (built.variables.generation(&gas.id, 0), 10.0),
                (built.variables.generation(&gas.id, 1), 10.0)
            ]
        );
    }

    #[rstest]
    #[case(None)]
    #[case(Some(0.0))]
    fn test_renewable_share_constraint_absent(
        gas: TechnologyDefinition,
        #[case] share: Option<f64>,
    ) {
        let weeks = [flat_week(2, 100.0, 0.5, 0.0, 1.0)];
        let built = build_problem(
            vec![&gas],
            &weeks,
            share.map(Dimensionless),
            &ModelOptions::default(),
        );
        assert_eq!(built.constraint_keys.renewable_share_row, None);
    }
}
