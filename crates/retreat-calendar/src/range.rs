//! Calendar range selection relative to a caller-supplied "now".

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;
use crate::event::Occurrence;

/// Which part of the calendar to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarRange {
    /// Occurrences still in progress or in the future.
    #[default]
    Upcoming,
    /// Occurrences that have already ended.
    Past,
    All,
}

impl CalendarRange {
    /// An occurrence ending exactly at `now` still counts as upcoming.
    pub fn contains(self, occurrence: &Occurrence, now: DateTime<Utc>) -> bool {
        match self {
            CalendarRange::Upcoming => occurrence.end >= now,
            CalendarRange::Past => occurrence.end < now,
            CalendarRange::All => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CalendarRange::Upcoming => "upcoming",
            CalendarRange::Past => "past",
            CalendarRange::All => "all",
        }
    }
}

impl FromStr for CalendarRange {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(CalendarRange::Upcoming),
            "past" => Ok(CalendarRange::Past),
            "all" => Ok(CalendarRange::All),
            _ => Err(CalendarError::InvalidRange(s.to_string())),
        }
    }
}

impl fmt::Display for CalendarRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keep the occurrences inside `range`, preserving their relative order.
pub fn filter_occurrences(
    occurrences: Vec<Occurrence>,
    range: CalendarRange,
    now: DateTime<Utc>,
) -> Vec<Occurrence> {
    occurrences
        .into_iter()
        .filter(|o| range.contains(o, now))
        .collect()
}

/// The earliest occurrence that has not ended by `now`.
pub fn next_occurrence(occurrences: &[Occurrence], now: DateTime<Utc>) -> Option<&Occurrence> {
    occurrences
        .iter()
        .filter(|o| o.end >= now)
        .min_by_key(|o| o.start)
}
