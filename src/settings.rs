//! Program-wide settings, read from `settings.toml` in the user's config folder.
//!
//! Settings apply to every model run on this machine, as opposed to `model.toml`, which belongs
//! to one model. A missing file means every setting takes its default.
use crate::get_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::Result;
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// The folder, relative to the working directory, in which results are saved by default
const DEFAULT_RESULTS_ROOT: &str = "gridplan_results";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# gridplan settings
#
# Every setting below is commented out and shows its default value. Remove the leading `# ` from
# a setting to change it.
";

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Log level for the console and log files: off, error, warn, info, debug or trace
    pub log_level: String,
    /// Replace a non-empty output folder without needing `--overwrite`
    pub overwrite: bool,
    /// Folder in which a results folder is created for each model, unless `--output-dir` is given
    pub results_root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            overwrite: false,
            results_root: PathBuf::from(DEFAULT_RESULTS_ROOT),
        }
    }
}

impl Settings {
    /// Load settings from the user's settings file, if there is one
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Load settings from `file_path`, using the defaults if there is no such file
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if file_path.is_file() {
            read_toml(file_path)
        } else {
            Ok(Settings::default())
        }
    }

    /// The contents of a placeholder settings file.
    ///
    /// Each setting is commented out, preceded by its documentation.
    pub fn default_file_contents() -> String {
        let defaults =
            toml::to_string(&Settings::default()).expect("Default settings are valid TOML");

        let mut out = String::from(DEFAULT_SETTINGS_FILE_HEADER);
        for line in defaults.lines() {
            let Some((field, _)) = line.split_once('=') else {
                continue;
            };

            let docs = Settings::get_field_docs(field.trim()).unwrap_or_default();
            out.push('\n');
            for doc_line in docs.lines() {
                out.push_str(&format!("# # {}\n", doc_line.trim()));
            }
            out.push_str(&format!("# {}\n", line.trim()));
        }

        out
    }
}
