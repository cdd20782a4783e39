//! Fixtures for tests

use crate::hour::{HOURS_PER_WEEK, HourlyRecord, RepresentativeWeek, WeekKind};
use crate::technology::{Resource, TechnologyCategory, TechnologyDefinition};
use crate::units::{
    Dimensionless, Energy, EmissionsPerEnergy, Hours, MoneyPerCapacity, MoneyPerEnergy,
};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A technology with all costs zero, for tests to customise
fn technology(id: &str, category: TechnologyCategory) -> TechnologyDefinition {
    TechnologyDefinition {
        id: id.into(),
        category,
        resource: None,
        capital_cost: MoneyPerCapacity(0.0),
        fixed_operating_cost: MoneyPerCapacity(0.0),
        variable_operating_cost: MoneyPerEnergy(0.0),
        fuel_cost: MoneyPerEnergy(0.0),
        lifetime: 20,
        discount_rate: Dimensionless(0.05),
        emission_factor: EmissionsPerEnergy(0.0),
        efficiency: Dimensionless(1.0),
        duration: Hours(4.0),
        enabled: true,
        fixed_capacity: None,
    }
}

#[fixture]
pub fn gas() -> TechnologyDefinition {
    TechnologyDefinition {
        capital_cost: MoneyPerCapacity(900_000.0),
        fixed_operating_cost: MoneyPerCapacity(15_000.0),
        variable_operating_cost: MoneyPerEnergy(4.0),
        fuel_cost: MoneyPerEnergy(50.0),
        emission_factor: EmissionsPerEnergy(0.4),
        ..technology("gas", TechnologyCategory::Dispatchable)
    }
}

#[fixture]
pub fn nuclear() -> TechnologyDefinition {
    TechnologyDefinition {
        capital_cost: MoneyPerCapacity(6_000_000.0),
        fixed_operating_cost: MoneyPerCapacity(100_000.0),
        variable_operating_cost: MoneyPerEnergy(2.0),
        fuel_cost: MoneyPerEnergy(8.0),
        lifetime: 60,
        ..technology("nuclear", TechnologyCategory::Baseload)
    }
}

#[fixture]
pub fn solar() -> TechnologyDefinition {
    TechnologyDefinition {
        resource: Some(Resource::Solar),
        capital_cost: MoneyPerCapacity(700_000.0),
        fixed_operating_cost: MoneyPerCapacity(10_000.0),
        lifetime: 25,
        ..technology("solar", TechnologyCategory::Renewable)
    }
}

#[fixture]
pub fn wind() -> TechnologyDefinition {
    TechnologyDefinition {
        resource: Some(Resource::Wind),
        capital_cost: MoneyPerCapacity(1_300_000.0),
        fixed_operating_cost: MoneyPerCapacity(30_000.0),
        lifetime: 25,
        ..technology("wind", TechnologyCategory::Renewable)
    }
}

#[fixture]
pub fn battery() -> TechnologyDefinition {
    TechnologyDefinition {
        capital_cost: MoneyPerCapacity(250_000.0),
        fixed_operating_cost: MoneyPerCapacity(20_000.0),
        efficiency: Dimensionless(0.9),
        lifetime: 15,
        ..technology("battery", TechnologyCategory::Storage)
    }
}

/// An hourly record with weight 1, included in statistics
pub fn hourly_record(hour: usize, demand: f64, solar: f64, wind: f64) -> HourlyRecord {
    HourlyRecord {
        hour,
        timestamp: format!("2023-01-01T{:02}:00", hour % 24),
        demand: Energy(demand),
        solar: Dimensionless(solar),
        wind: Dimensionless(wind),
        offshore: Dimensionless(wind),
        weight: Dimensionless(1.0),
        include_in_stats: true,
    }
}

/// A week of constant demand and availability with the given number of hours
pub fn flat_week(
    hours: usize,
    demand: f64,
    solar: f64,
    wind: f64,
    weight: f64,
) -> RepresentativeWeek {
    let records = (0..hours)
        .map(|hour| HourlyRecord {
            weight: Dimensionless(weight),
            ..hourly_record(hour, demand, solar, wind)
        })
        .collect();
    RepresentativeWeek::new(WeekKind::Regular, records)
}

/// A full week with a simple day/night solar profile
#[fixture]
pub fn solar_week() -> RepresentativeWeek {
    let records = (0..HOURS_PER_WEEK)
        .map(|hour| {
            let solar = if (8..16).contains(&(hour % 24)) {
                0.8
            } else {
                0.0
            };
            HourlyRecord {
                weight: Dimensionless(52.0),
                ..hourly_record(hour, 100.0, solar, 0.3)
            }
        })
        .collect();
    RepresentativeWeek::new(WeekKind::Regular, records)
}
