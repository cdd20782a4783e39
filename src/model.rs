//! Code for loading a model: its parameters, technologies and representative weeks.
use crate::hour::RepresentativeWeek;
use crate::input::hour::read_weeks;
use crate::input::technology::read_technologies;
use crate::simulation::SimulationRequest;
use crate::technology::TechnologyCatalog;
use anyhow::Result;
use log::info;
use std::path::Path;

pub mod parameters;
pub use parameters::{ModelOptions, ModelParameters, StorageCycle};

/// Model definition
#[derive(Debug, PartialEq)]
pub struct Model {
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// The technologies which may be built
    pub technologies: TechnologyCatalog,
    /// Representative weeks of demand and weather data
    pub weeks: Vec<RepresentativeWeek>,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let model_dir = model_dir.as_ref();
        let parameters = ModelParameters::from_path(model_dir)?;
        let technologies = read_technologies(model_dir)?;
        let weeks = read_weeks(model_dir)?;

        info!(
            "Read {} technologies and {} representative weeks",
            technologies.len(),
            weeks.len()
        );

        Ok(Model {
            parameters,
            technologies,
            weeks,
        })
    }

    /// Create the request for a single optimisation run of this model
    pub fn to_request(&self) -> SimulationRequest {
        SimulationRequest {
            technologies: self.technologies.clone(),
            weeks: self.weeks.clone(),
            min_renewable_share: self.parameters.min_renewable_share,
            options: self.parameters.options.clone(),
        }
    }
}
