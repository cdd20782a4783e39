//! The module responsible for writing output data to disk.
use crate::results::{HourlyDispatch, SimulationResult, SystemSummary, TechnologyResult};
use crate::technology::{TechnologyCategory, TechnologyID};
use crate::units::{Capacity, Dimensionless, Emissions, Energy, Money, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The output file name for hourly system operation
const DISPATCH_FILE_NAME: &str = "dispatch.csv";

/// The output file name for hourly generation by technology
const GENERATION_FILE_NAME: &str = "generation.csv";

/// The output file name for per-technology results
const TECHNOLOGIES_FILE_NAME: &str = "technologies.csv";

/// The output file name for system totals
const SUMMARY_FILE_NAME: &str = "summary.toml";

/// The default output folder for a model: a folder named after the model under `results_root`
pub fn get_output_dir(model_dir: &Path, results_root: &Path) -> Result<PathBuf> {
    // Resolve the path first so that e.g. "." gives the name of the current folder
    let model_dir = model_dir
        .canonicalize()
        .with_context(|| format!("Could not resolve path to model: {}", model_dir.display()))?;
    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?;

    Ok(results_root.join(model_name))
}

/// Create a new output directory, replacing a non-empty existing one if `allow_overwrite` is set.
///
/// # Returns
///
/// Whether an existing, non-empty directory was replaced.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        if output_dir.read_dir()?.next().is_none() {
            // Empty folder, so nothing to overwrite
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
        fs::create_dir_all(output_dir)?;
        return Ok(true);
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// Represents a row in the dispatch CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DispatchRow {
    hour: usize,
    timestamp: String,
    weight: Dimensionless,
    include_in_stats: bool,
    demand: Energy,
    charge: Energy,
    discharge: Energy,
    state_of_charge: Energy,
    unserved: Energy,
}

impl DispatchRow {
    fn new(hour: &HourlyDispatch) -> Self {
        Self {
            hour: hour.hour,
            timestamp: hour.timestamp.clone(),
            weight: hour.weight,
            include_in_stats: hour.include_in_stats,
            demand: hour.demand,
            charge: hour.charge,
            discharge: hour.discharge,
            state_of_charge: hour.state_of_charge,
            unserved: hour.unserved,
        }
    }
}

/// Represents a row in the generation CSV file.
///
/// Curtailment is only given for renewables.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct GenerationRow {
    hour: usize,
    technology_id: TechnologyID,
    generation: Energy,
    curtailment: Option<Energy>,
}

/// Represents a row in the technologies CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TechnologyRow {
    technology_id: TechnologyID,
    category: TechnologyCategory,
    capacity: Capacity,
    generation: Energy,
    fixed_cost: Money,
    variable_cost: Money,
    total_cost: Money,
    lcoe_contribution: MoneyPerEnergy,
    curtailment: Energy,
    emissions: Emissions,
}

impl TechnologyRow {
    fn new(technology_id: &TechnologyID, result: &TechnologyResult) -> Self {
        Self {
            technology_id: technology_id.clone(),
            category: result.category,
            capacity: result.capacity,
            generation: result.generation,
            fixed_cost: result.fixed_cost,
            variable_cost: result.variable_cost,
            total_cost: result.total_cost,
            lcoe_contribution: result.lcoe_contribution,
            curtailment: result.curtailment,
            emissions: result.emissions,
        }
    }
}

/// An object for writing simulation results to file
pub struct DataWriter {
    output_path: PathBuf,
    dispatch_writer: csv::Writer<File>,
    generation_writer: csv::Writer<File>,
    technologies_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name: &str| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(&file_path)
                .with_context(|| format!("Could not create {}", file_path.display()))
        };

        Ok(Self {
            output_path: output_path.to_path_buf(),
            dispatch_writer: new_writer(DISPATCH_FILE_NAME)?,
            generation_writer: new_writer(GENERATION_FILE_NAME)?,
            technologies_writer: new_writer(TECHNOLOGIES_FILE_NAME)?,
        })
    }

    /// Write every part of a result
    pub fn write_results(&mut self, result: &SimulationResult) -> Result<()> {
        self.write_dispatch(&result.dispatch)?;
        self.write_technologies(result.technologies.iter())?;
        self.write_summary(&result.summary)?;

        Ok(())
    }

    /// Write hourly operation and generation to CSV files
    pub fn write_dispatch(&mut self, dispatch: &[HourlyDispatch]) -> Result<()> {
        for hour in dispatch {
            self.dispatch_writer.serialize(DispatchRow::new(hour))?;

            for (technology_id, generation) in &hour.generation {
                let row = GenerationRow {
                    hour: hour.hour,
                    technology_id: technology_id.clone(),
                    generation: *generation,
                    curtailment: hour.curtailment.get(technology_id).copied(),
                };
                self.generation_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write per-technology results to a CSV file
    pub fn write_technologies<'a, I>(&mut self, technologies: I) -> Result<()>
    where
        I: Iterator<Item = (&'a TechnologyID, &'a TechnologyResult)>,
    {
        for (technology_id, result) in technologies {
            self.technologies_writer
                .serialize(TechnologyRow::new(technology_id, result))?;
        }

        Ok(())
    }

    /// Write system totals to a TOML file
    pub fn write_summary(&self, summary: &SystemSummary) -> Result<()> {
        let file_path = self.output_path.join(SUMMARY_FILE_NAME);
        fs::write(&file_path, toml::to_string(summary)?)
            .with_context(|| format!("Could not write {}", file_path.display()))?;

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.dispatch_writer.flush()?;
        self.generation_writer.flush()?;
        self.technologies_writer.flush()?;

        Ok(())
    }
}
