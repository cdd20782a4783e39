//! Code for reading hourly demand and availability data and grouping it into weeks.
use super::{deserialise_proportion, input_err_msg, read_csv};
use crate::hour::{HOURS_PER_WEEK, HourlyRecord, RepresentativeWeek, WeekKind};
use crate::units::{Dimensionless, Energy};
use ::log::debug;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const HOURS_FILE_NAME: &str = "hours.csv";

fn default_include_in_stats() -> bool {
    true
}

/// An hourly record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct HourRaw {
    week: u32,
    hour: usize,
    #[serde(default)]
    timestamp: String,
    demand: f64,
    #[serde(deserialize_with = "deserialise_proportion")]
    solar: f64,
    #[serde(deserialize_with = "deserialise_proportion")]
    wind: f64,
    #[serde(default, deserialize_with = "deserialise_proportion")]
    offshore: f64,
    weight: f64,
    #[serde(default = "default_include_in_stats")]
    include_in_stats: bool,
    #[serde(default)]
    kind: WeekKind,
}

impl HourRaw {
    fn into_record(self) -> Result<HourlyRecord> {
        ensure!(
            self.demand.is_finite() && self.demand >= 0.0,
            "Demand must be a non-negative number (week {}, hour {})",
            self.week,
            self.hour
        );
        ensure!(
            self.weight.is_finite() && self.weight >= 0.0,
            "Weight must be a non-negative number (week {}, hour {})",
            self.week,
            self.hour
        );

        Ok(HourlyRecord {
            hour: self.hour,
            timestamp: self.timestamp,
            demand: Energy(self.demand),
            solar: Dimensionless(self.solar),
            wind: Dimensionless(self.wind),
            offshore: Dimensionless(self.offshore),
            weight: Dimensionless(self.weight),
            include_in_stats: self.include_in_stats,
        })
    }
}

/// Build a week from consecutive rows sharing a week number
fn read_week<I>(week: u32, rows: I) -> Result<RepresentativeWeek>
where
    I: Iterator<Item = HourRaw>,
{
    let mut kind = None;
    let mut records = Vec::new();
    for row in rows {
        ensure!(
            *kind.get_or_insert(row.kind) == row.kind,
            "All hours in week {week} must be of the same kind"
        );
        records.push(row.into_record()?);
    }

    ensure!(
        records.iter().map(|record| record.weight).all_equal(),
        "All hours in week {week} must have the same weight"
    );

    if records.len() != HOURS_PER_WEEK {
        debug!(
            "Week {week} has {} hours rather than {HOURS_PER_WEEK}",
            records.len()
        );
    }

    Ok(RepresentativeWeek::new(kind.unwrap_or_default(), records))
}

fn read_weeks_from_iter<I>(iter: I) -> Result<Vec<RepresentativeWeek>>
where
    I: Iterator<Item = HourRaw>,
{
    let mut seen = HashSet::new();
    let mut weeks = Vec::new();
    for (week, rows) in &iter.chunk_by(|row| row.week) {
        ensure!(
            seen.insert(week),
            "Hours for week {week} must be listed consecutively"
        );
        weeks.push(read_week(week, rows)?);
    }

    Ok(weeks)
}

/// Read the representative weeks from the specified model directory
pub fn read_weeks(model_dir: &Path) -> Result<Vec<RepresentativeWeek>> {
    let file_path = model_dir.join(HOURS_FILE_NAME);
    let hours_csv = read_csv(&file_path)?;
    read_weeks_from_iter(hours_csv).with_context(|| input_err_msg(&file_path))
}
