//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{input_err_msg, read_toml};
use crate::simulation::optimisation::solver::SolverOptions;
use crate::units::{Dimensionless, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use log::warn;
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

define_unit_param_default!(default_value_of_lost_load, MoneyPerEnergy, 1e6);
define_unit_param_default!(default_storage_cycling_cost, MoneyPerEnergy, 0.1);
define_unit_param_default!(default_availability_threshold, Dimensionless, 1e-4);

/// How state of charge is treated at the first hour of each representative week
#[derive(
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Default,
)]
pub enum StorageCycle {
    /// Each week starts with an empty store
    #[default]
    #[string = "reset"]
    Reset,
    /// The first hour of each week follows on from the week's last hour
    #[string = "cyclic"]
    Cyclic,
}

/// Knobs controlling how the optimisation problem is built
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ModelOptions {
    /// The penalty applied to each MWh of unserved demand.
    ///
    /// This must be large enough that building and running real supply is always cheaper.
    #[serde(default = "default_value_of_lost_load")]
    pub value_of_lost_load: MoneyPerEnergy,
    /// A small cost applied to each MWh charged into storage, to discourage pointless cycling
    #[serde(default = "default_storage_cycling_cost")]
    pub storage_cycling_cost: MoneyPerEnergy,
    /// How storage behaves across week boundaries
    #[serde(default)]
    pub storage_cycle: StorageCycle,
    /// Renewable availability factors below this value are treated as zero
    #[serde(default = "default_availability_threshold")]
    pub availability_threshold: Dimensionless,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            value_of_lost_load: default_value_of_lost_load(),
            storage_cycling_cost: default_storage_cycling_cost(),
            storage_cycle: StorageCycle::default(),
            availability_threshold: default_availability_threshold(),
        }
    }
}

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq, Default)]
pub struct ModelParameters {
    /// Minimum share of demand (in percent) which must be met by renewables and storage
    #[serde(default)]
    pub min_renewable_share: Option<Dimensionless>,
    /// Options for building the optimisation problem
    #[serde(default)]
    pub options: ModelOptions,
    /// Options for the solver
    #[serde(default)]
    pub solver: SolverOptions,
}

/// Check that the `min_renewable_share` parameter is valid
fn check_min_renewable_share(value: Option<Dimensionless>) -> Result<()> {
    if let Some(share) = value {
        ensure!(
            (0.0..=100.0).contains(&share.value()),
            "min_renewable_share must be a percentage between 0 and 100"
        );
    }

    Ok(())
}

/// Check that the `value_of_lost_load` parameter is valid
fn check_value_of_lost_load(value: MoneyPerEnergy) -> Result<()> {
    ensure!(
        value.value().is_finite() && value > MoneyPerEnergy(0.0),
        "value_of_lost_load must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the `storage_cycling_cost` parameter is valid
fn check_storage_cycling_cost(value: MoneyPerEnergy) -> Result<()> {
    ensure!(
        value.value().is_finite() && value >= MoneyPerEnergy(0.0),
        "storage_cycling_cost must be a finite number greater than or equal to zero"
    );

    Ok(())
}

/// Check that the `availability_threshold` parameter is valid
fn check_availability_threshold(value: Dimensionless) -> Result<()> {
    ensure!(
        (0.0..1.0).contains(&value.value()),
        "availability_threshold must be in the range [0, 1)"
    );

    Ok(())
}

impl ModelOptions {
    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        check_value_of_lost_load(self.value_of_lost_load)?;
        check_storage_cycling_cost(self.storage_cycling_cost)?;
        check_availability_threshold(self.availability_threshold)?;

        Ok(())
    }
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Replace the minimum renewable share, e.g. with a value given on the command line
    pub fn set_min_renewable_share(&mut self, share: Dimensionless) -> Result<()> {
        check_min_renewable_share(Some(share))?;
        self.min_renewable_share = Some(share);

        Ok(())
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_min_renewable_share(self.min_renewable_share)?;
        self.options.validate()?;

        if self.options.storage_cycling_cost == MoneyPerEnergy(0.0) {
            warn!(
                "storage_cycling_cost is zero; storage may charge and discharge in the same hour"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_model_params_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "min_renewable_share = 80

[options]
storage_cycle = \"cyclic\"

[solver]
time_limit = 60.0"
            )
            .unwrap();
        }

        let model_params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(model_params.min_renewable_share, Some(Dimensionless(80.0)));
        assert_eq!(model_params.options.storage_cycle, StorageCycle::Cyclic);
        assert_eq!(
            model_params.options.value_of_lost_load,
            default_value_of_lost_load()
        );
        assert_eq!(model_params.solver.time_limit, Some(60.0));
    }

    #[test]
    fn test_model_params_from_path_empty_file() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();

        let model_params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(model_params, ModelParameters::default());
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some(0.0), true)]
    #[case(Some(100.0), true)]
    #[case(Some(-1.0), false)]
    #[case(Some(100.1), false)]
    #[case(Some(f64::NAN), false)]
    fn test_check_min_renewable_share(#[case] value: Option<f64>, #[case] expected_valid: bool) {
        let result = check_min_renewable_share(value.map(Dimensionless));
        assert_eq!(result.is_ok(), expected_valid);
    }

    #[test]
    fn test_set_min_renewable_share() {
        let mut model_params = ModelParameters::default();
        model_params
            .set_min_renewable_share(Dimensionless(60.0))
            .unwrap();
        assert_eq!(model_params.min_renewable_share, Some(Dimensionless(60.0)));

        assert!(
            model_params
                .set_min_renewable_share(Dimensionless(120.0))
                .is_err()
        );
        assert_eq!(model_params.min_renewable_share, Some(Dimensionless(60.0)));
    }

    #[rstest]
    #[case(1.0, true)] // Valid positive value
    #[case(1e6, true)] // Valid large value (default)
    #[case(0.0, false)] // Invalid: exactly zero
    #[case(-1.0, false)] // Invalid: negative value
    #[case(f64::INFINITY, false)] // Invalid: infinite value
    #[case(f64::NAN, false)] // Invalid: NaN value
    fn test_check_value_of_lost_load(#[case] value: f64, #[case] expected_valid: bool) {
        let result = check_value_of_lost_load(MoneyPerEnergy::new(value));
        assert_eq!(result.is_ok(), expected_valid);
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(0.1, true)]
    #[case(-0.1, false)]
    #[case(f64::NAN, false)]
    fn test_check_storage_cycling_cost(#[case] value: f64, #[case] expected_valid: bool) {
        let result = check_storage_cycling_cost(MoneyPerEnergy::new(value));
        assert_eq!(result.is_ok(), expected_valid);
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(1e-4, true)]
    #[case(1.0, false)]
    #[case(-1e-4, false)]
    fn test_check_availability_threshold(#[case] value: f64, #[case] expected_valid: bool) {
        let result = check_availability_threshold(Dimensionless::new(value));
        assert_eq!(result.is_ok(), expected_valid);
    }
}
