//! Code for reading the technologies CSV file
use super::{input_err_msg, read_csv};
use crate::technology::{Resource, TechnologyCatalog, TechnologyCategory, TechnologyDefinition};
use crate::units::{
    Capacity, Dimensionless, EmissionsPerEnergy, Hours, MoneyPerCapacity, MoneyPerEnergy,
};
use ::log::warn;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const TECHNOLOGIES_FILE_NAME: &str = "technologies.csv";

/// Default duration for storage technologies, in hours
const DEFAULT_STORAGE_DURATION: f64 = 4.0;

fn default_enabled() -> bool {
    true
}

/// A technology record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct TechnologyRaw {
    id: String,
    category: TechnologyCategory,
    #[serde(default)]
    resource: Option<Resource>,
    capital_cost: f64,
    fixed_operating_cost: f64,
    variable_operating_cost: f64,
    #[serde(default)]
    fuel_cost: f64,
    lifetime: u32,
    #[serde(default)]
    discount_rate: Option<f64>,
    #[serde(default)]
    emission_factor: f64,
    #[serde(default)]
    efficiency: Option<f64>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    fixed_capacity: Option<f64>,
}

impl TechnologyRaw {
    /// Validates the `TechnologyRaw` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `lifetime` is 0.
    /// - any cost, the discount rate or the emission factor is negative.
    /// - a renewable has no resource, or a non-renewable has one.
    /// - a storage efficiency is outside (0, 1] or its duration is not positive.
    /// - `fixed_capacity` is negative.
    ///
    /// # Warnings
    ///
    /// Logs a warning if `discount_rate` is greater than 1.
    fn validate(&self) -> Result<()> {
        let id = &self.id;
        ensure!(
            self.lifetime > 0,
            "Error in technology {id}: Lifetime must be greater than 0"
        );

        for (name, value) in [
            ("capital_cost", self.capital_cost),
            ("fixed_operating_cost", self.fixed_operating_cost),
            ("variable_operating_cost", self.variable_operating_cost),
            ("fuel_cost", self.fuel_cost),
            ("emission_factor", self.emission_factor),
        ] {
            ensure!(
                value.is_finite() && value >= 0.0,
                "Error in technology {id}: {name} must be a non-negative number"
            );
        }

        if let Some(dr) = self.discount_rate {
            ensure!(
                dr >= 0.0,
                "Error in technology {id}: Discount rate must be positive"
            );

            if dr > 1.0 {
                warn!("Warning in technology {id}: Discount rate is greater than 1");
            }
        }

        match self.category {
            TechnologyCategory::Renewable => ensure!(
                self.resource.is_some(),
                "Error in technology {id}: Renewable technologies must specify a resource"
            ),
            _ => ensure!(
                self.resource.is_none(),
                "Error in technology {id}: Only renewable technologies can specify a resource"
            ),
        }

        if self.category == TechnologyCategory::Storage {
            if let Some(efficiency) = self.efficiency {
                ensure!(
                    efficiency > 0.0 && efficiency <= 1.0,
                    "Error in technology {id}: Efficiency must be in the range (0, 1]"
                );
            }
            if let Some(duration) = self.duration {
                ensure!(
                    duration.is_finite() && duration > 0.0,
                    "Error in technology {id}: Duration must be greater than 0"
                );
            }
        }

        if let Some(capacity) = self.fixed_capacity {
            ensure!(
                capacity.is_finite() && capacity >= 0.0,
                "Error in technology {id}: Fixed capacity must be a non-negative number"
            );
        }

        Ok(())
    }

    fn into_definition(self) -> Result<TechnologyDefinition> {
        self.validate()?;

        let is_storage = self.category == TechnologyCategory::Storage;
        Ok(TechnologyDefinition {
            id: self.id.into(),
            category: self.category,
            resource: self.resource,
            capital_cost: MoneyPerCapacity(self.capital_cost),
            fixed_operating_cost: MoneyPerCapacity(self.fixed_operating_cost),
            variable_operating_cost: MoneyPerEnergy(self.variable_operating_cost),
            fuel_cost: MoneyPerEnergy(self.fuel_cost),
            lifetime: self.lifetime,
            discount_rate: Dimensionless(self.discount_rate.unwrap_or(0.0)),
            emission_factor: EmissionsPerEnergy(self.emission_factor),
            efficiency: Dimensionless(if is_storage {
                self.efficiency.unwrap_or(1.0)
            } else {
                1.0
            }),
            duration: Hours(self.duration.unwrap_or(DEFAULT_STORAGE_DURATION)),
            enabled: self.enabled,
            fixed_capacity: self.fixed_capacity.map(Capacity),
        })
    }
}

fn read_technologies_from_iter<I>(iter: I) -> Result<TechnologyCatalog>
where
    I: Iterator<Item = TechnologyRaw>,
{
    let mut catalog = TechnologyCatalog::new();
    for raw in iter {
        let technology = raw.into_definition()?;
        let id = technology.id.clone();
        ensure!(
            catalog.insert(technology).is_none(),
            "Duplicate technology ID found: {id}"
        );
    }

    Ok(catalog)
}

/// Read the technology catalog from the specified model directory
pub fn read_technologies(model_dir: &Path) -> Result<TechnologyCatalog> {
    let file_path = model_dir.join(TECHNOLOGIES_FILE_NAME);
    let technologies_csv = read_csv(&file_path)?;
    read_technologies_from_iter(technologies_csv).with_context(|| input_err_msg(&file_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn raw(id: &str, category: TechnologyCategory) -> TechnologyRaw {
        TechnologyRaw {
            id: id.into(),
            category,
            resource: None,
            capital_cost: 1000.0,
            fixed_operating_cost: 10.0,
            variable_operating_cost: 1.0,
            fuel_cost: 0.0,
            lifetime: 20,
            discount_rate: Some(0.05),
            emission_factor: 0.0,
            efficiency: None,
            duration: None,
            enabled: true,
            fixed_capacity: None,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(raw("gas", TechnologyCategory::Dispatchable).validate().is_ok());

        let solar = TechnologyRaw {
            resource: Some(Resource::Solar),
            ..raw("solar", TechnologyCategory::Renewable)
        };
        assert!(solar.validate().is_ok());

        let battery = TechnologyRaw {
            efficiency: Some(0.9),
            duration: Some(2.0),
            ..raw("battery", TechnologyCategory::Storage)
        };
        assert!(battery.validate().is_ok());
    }

    #[test]
    fn test_validate_errors() {
        let zero_lifetime = TechnologyRaw {
            lifetime: 0,
            ..raw("gas", TechnologyCategory::Dispatchable)
        };
        assert_error!(
            zero_lifetime.validate(),
            "Error in technology gas: Lifetime must be greater than 0"
        );

        let negative_cost = TechnologyRaw {
            capital_cost: -1.0,
            ..raw("gas", TechnologyCategory::Dispatchable)
        };
        assert_error!(
            negative_cost.validate(),
            "Error in technology gas: capital_cost must be a non-negative number"
        );

        assert_error!(
            raw("solar", TechnologyCategory::Renewable).validate(),
            "Error in technology solar: Renewable technologies must specify a resource"
        );

        let bad_efficiency = TechnologyRaw {
            efficiency: Some(1.5),
            ..raw("battery", TechnologyCategory::Storage)
        };
        assert_error!(
            bad_efficiency.validate(),
            "Error in technology battery: Efficiency must be in the range (0, 1]"
        );
    }

    #[test]
    fn test_into_definition_defaults() {
        let gas = TechnologyRaw {
            discount_rate: None,
            efficiency: Some(0.5), // Ignored for non-storage
            ..raw("gas", TechnologyCategory::Dispatchable)
        }
        .into_definition()
        .unwrap();
        assert_eq!(gas.discount_rate, Dimensionless(0.0));
        assert_eq!(gas.efficiency, Dimensionless(1.0));
        assert_eq!(gas.duration, Hours(DEFAULT_STORAGE_DURATION));
    }

    #[test]
    fn test_read_technologies_from_iter_duplicate() {
        let iter = [
            raw("gas", TechnologyCategory::Dispatchable),
            raw("gas", TechnologyCategory::Baseload),
        ]
        .into_iter();
        assert_error!(
            read_technologies_from_iter(iter),
            "Duplicate technology ID found: gas"
        );
    }

    #[test]
    fn test_read_technologies() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(TECHNOLOGIES_FILE_NAME)).unwrap();
            writeln!(
                file,
                "id,category,resource,capital_cost,fixed_operating_cost,variable_operating_cost,\
fuel_cost,lifetime,discount_rate,emission_factor,efficiency,duration,enabled,fixed_capacity
solar,renewable,solar,700000,10000,0,0,25,0.05,0,,,true,
gas,dispatchable,,900000,15000,4,50,30,0.05,0.4,,,true,500
battery,storage,,250000,20000,0,0,15,0.05,0,0.9,4,false,"
            )
            .unwrap();
        }

        let catalog = read_technologies(dir.path()).unwrap();
        assert_eq!(catalog.len(), 3);

        let solar = catalog.get("solar").unwrap();
        assert_eq!(solar.resource, Some(Resource::Solar));
        assert!(solar.is_renewable());

        let gas = catalog.get("gas").unwrap();
        assert_eq!(gas.fixed_capacity, Some(Capacity(500.0)));
        assert_eq!(gas.fuel_cost, MoneyPerEnergy(50.0));

        let battery = catalog.get("battery").unwrap();
        assert!(!battery.enabled);
        assert_eq!(battery.efficiency, Dimensionless(0.9));
    }
}
