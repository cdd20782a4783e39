//! Writes `metadata.toml`, recording what was run, with which build of gridplan and where.
use crate::hour::timeline_len;
use crate::model::{Model, StorageCycle};
use anyhow::{Result, anyhow};
use chrono::Local;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

const METADATA_FILE_NAME: &str = "metadata.toml";

/// Build information generated by the `built` crate
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// The short git hash gridplan was built from, marked if the tree had local changes
fn git_commit() -> String {
    match (built_info::GIT_COMMIT_HASH_SHORT, built_info::GIT_DIRTY) {
        (Some(hash), Some(true)) => format!("{hash}-dirty"),
        (Some(hash), _) => hash.to_string(),
        (None, _) => "unknown".to_string(),
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    model: ModelMetadata,
    program: ProgramMetadata,
    platform: PlatformMetadata,
}

#[derive(Serialize)]
struct RunMetadata<'a> {
    model_path: &'a Path,
    started: String,
}

/// The size and policy settings of the model which was optimised
#[derive(Serialize)]
struct ModelMetadata {
    technologies: usize,
    modelled_technologies: usize,
    representative_weeks: usize,
    hours: usize,
    min_renewable_share: Option<f64>,
    storage_cycle: StorageCycle,
}

impl ModelMetadata {
    fn new(model: &Model) -> Self {
        Self {
            technologies: model.technologies.len(),
            modelled_technologies: model.technologies.modelled_technologies().len(),
            representative_weeks: model.weeks.len(),
            hours: timeline_len(&model.weeks),
            min_renewable_share: model
                .parameters
                .min_renewable_share
                .map(|share| share.value()),
            storage_cycle: model.parameters.options.storage_cycle,
        }
    }
}

#[derive(Serialize)]
struct ProgramMetadata {
    name: &'static str,
    version: &'static str,
    git_commit: String,
    /// Target triple (e.g. x86_64-unknown-linux-gnu)
    target: &'static str,
    debug_build: bool,
    rustc_version: &'static str,
    built_utc: &'static str,
}

impl ProgramMetadata {
    fn new() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            git_commit: git_commit(),
            target: built_info::TARGET,
            debug_build: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            built_utc: built_info::BUILT_TIME_UTC,
        }
    }
}

#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    release: String,
    machine: String,
    osname: String,
}

impl PlatformMetadata {
    fn new() -> Result<Self> {
        let info =
            PlatformInfo::new().map_err(|err| anyhow!("Unable to determine platform: {err}"))?;

        Ok(Self {
            sysname: info.sysname().to_string_lossy().into_owned(),
            release: info.release().to_string_lossy().into_owned(),
            machine: info.machine().to_string_lossy().into_owned(),
            osname: info.osname().to_string_lossy().into_owned(),
        })
    }
}

/// Write metadata for a run of `model` to the output folder
pub fn write_metadata(output_path: &Path, model_path: &Path, model: &Model) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata {
            model_path,
            started: Local::now().to_rfc3339(),
        },
        model: ModelMetadata::new(model),
        program: ProgramMetadata::new(),
        platform: PlatformMetadata::new()?,
    };
    fs::write(
        output_path.join(METADATA_FILE_NAME),
        toml::to_string(&metadata)?,
    )?;

    Ok(())
}
