//! Least-cost capacity expansion and hourly dispatch for a single-bus electricity grid.
//!
//! A model is a set of candidate technologies plus weighted representative weeks of demand and
//! weather data. The engine builds a linear program choosing capacity and hourly operation,
//! solves it with HiGHS and reports dispatch, costs and emissions.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod finance;
pub mod hour;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod results;
pub mod settings;
pub mod simulation;
pub mod technology;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory in which program configuration files are stored
pub fn get_config_dir() -> PathBuf {
    let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("gridplan");
    dir
}
