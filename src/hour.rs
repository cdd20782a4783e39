//! Hourly demand and weather records, grouped into weighted representative weeks.
use crate::technology::Resource;
use crate::units::{Dimensionless, Energy};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The number of hours in a full representative week
pub const HOURS_PER_WEEK: usize = 168;

/// Demand and renewable availability for a single hour
#[derive(PartialEq, Clone, Debug)]
pub struct HourlyRecord {
    /// Index of the hour within the source data set
    pub hour: usize,
    /// Timestamp of the hour, as given in the source data
    pub timestamp: String,
    /// Demand in this hour (MW over one hour)
    pub demand: Energy,
    /// Solar availability factor
    pub solar: Dimensionless,
    /// Onshore wind availability factor
    pub wind: Dimensionless,
    /// Offshore wind availability factor
    pub offshore: Dimensionless,
    /// Weight of the week this hour belongs to
    pub weight: Dimensionless,
    /// Whether this hour counts towards reported averages and the renewable share policy
    pub include_in_stats: bool,
}

impl HourlyRecord {
    /// The availability factor for the given resource
    pub fn availability(&self, resource: Resource) -> Dimensionless {
        match resource {
            Resource::Solar => self.solar,
            Resource::Wind => self.wind,
            Resource::Offshore => self.offshore,
        }
    }
}

/// Distinguishes ordinary sampled weeks from stress-test weeks
#[derive(
    PartialEq,
    Eq,
    Clone,
    Copy,
    Debug,
    Default,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum WeekKind {
    /// A week sampled to represent typical conditions
    #[default]
    #[string = "regular"]
    Regular,
    /// A severe-outlier week kept for reliability rather than for statistics
    #[string = "extreme"]
    Extreme,
}

/// A weighted sequence of consecutive hours standing in for part of the year
#[derive(PartialEq, Clone, Debug)]
pub struct RepresentativeWeek {
    /// Whether this is a regular or extreme week
    pub kind: WeekKind,
    /// The number of real weeks this week represents
    pub weight: Dimensionless,
    /// The hours of the week, in order
    pub hours: Vec<HourlyRecord>,
}

impl RepresentativeWeek {
    /// Create a week, taking its weight from the first record
    pub fn new(kind: WeekKind, hours: Vec<HourlyRecord>) -> Self {
        let weight = hours.first().map_or(Dimensionless(0.0), |record| record.weight);
        Self {
            kind,
            weight,
            hours,
        }
    }
}

/// An hour on the concatenated timeline of all weeks
#[derive(Clone, Copy, Debug)]
pub struct TimelineHour<'a> {
    /// Position on the concatenated timeline
    pub index: usize,
    /// Timeline index of the first hour of the owning week
    pub week_start: usize,
    /// Timeline index of the last hour of the owning week
    pub week_end: usize,
    /// The owning week
    pub week: &'a RepresentativeWeek,
    /// The hour's data
    pub record: &'a HourlyRecord,
}

impl TimelineHour<'_> {
    /// Whether this is the first hour of its week
    pub fn is_week_start(&self) -> bool {
        self.index == self.week_start
    }

    /// The weight applied to per-hour costs and statistics
    pub fn weight(&self) -> Dimensionless {
        self.week.weight
    }
}

/// Iterate over every hour of every week, in order
pub fn iter_timeline(weeks: &[RepresentativeWeek]) -> impl Iterator<Item = TimelineHour<'_>> {
    let mut offset = 0;
    weeks.iter().flat_map(move |week| {
        let week_start = offset;
        offset += week.hours.len();
        let week_end = offset.saturating_sub(1);
        week.hours
            .iter()
            .enumerate()
            .map(move |(i, record)| TimelineHour {
                index: week_start + i,
                week_start,
                week_end,
                week,
                record,
            })
    })
}

/// The total number of hours across all weeks
pub fn timeline_len(weeks: &[RepresentativeWeek]) -> usize {
    weeks.iter().map(|week| week.hours.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::hourly_record;
    use itertools::Itertools;

    fn week(len: usize, weight: f64) -> RepresentativeWeek {
        let hours = (0..len)
            .map(|i| HourlyRecord {
                weight: Dimensionless(weight),
                ..hourly_record(i, 1.0, 0.0, 0.0)
            })
            .collect();
        RepresentativeWeek::new(WeekKind::Regular, hours)
    }

    #[test]
    fn test_week_weight_taken_from_records() {
        assert_eq!(week(3, 13.0).weight, Dimensionless(13.0));
        assert_eq!(week(0, 13.0).weight, Dimensionless(0.0));
    }

    #[test]
    fn test_iter_timeline() {
        let weeks = [week(2, 1.0), week(3, 2.0)];
        let hours = iter_timeline(&weeks).collect_vec();
        assert_eq!(hours.len(), timeline_len(&weeks));
        assert_eq!(
            hours.iter().map(|h| h.index).collect_vec(),
            [0, 1, 2, 3, 4]
        );
        assert_eq!(
            hours.iter().map(TimelineHour::is_week_start).collect_vec(),
            [true, false, true, false, false]
        );
        assert_eq!(hours[1].week_end, 1);
        assert_eq!(hours[2].week_end, 4);
        assert_eq!(hours[4].weight(), Dimensionless(2.0));
    }
}
