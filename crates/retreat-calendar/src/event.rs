//! Event records as the content backend delivers them, and the occurrences
//! derived from them.
//!
//! [`Recurrence`] mirrors the backend's loosely typed rule object. It is turned
//! into the closed [`RecurrenceRule`] form by [`Recurrence::parse`] right at the
//! expansion boundary, so unknown tokens surface as errors there instead of
//! travelling further.
//!
//! The backend projects unset fields as `null`, and editors type rule fields
//! by hand. Decoding therefore treats `null` as "unset" everywhere, and a
//! recurrence object never fails to decode: values it cannot read are kept as
//! problems and reported by [`Recurrence::parse`], which turns the event into a
//! rejected rule instead of losing the whole batch.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{CalendarError, Result};

/// A base event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
}

impl Event {
    /// `end - start`, or zero when the event has no end.
    pub fn duration(&self) -> Duration {
        self.end
            .map(|end| end - self.start)
            .unwrap_or_else(Duration::zero)
    }

    /// The recurrence object, if present and switched on.
    pub fn active_recurrence(&self) -> Option<&Recurrence> {
        self.recurrence.as_ref().filter(|r| r.is_recurring)
    }

    /// Check the record against the event contract.
    ///
    /// `index` is the record's position in its batch and is carried into the
    /// error so the offending record can be found.
    pub fn validate(&self, index: usize) -> Result<()> {
        let invalid = |reason: String| CalendarError::InvalidEvent {
            index,
            id: (!self.id.trim().is_empty()).then(|| self.id.clone()),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty id".to_string()));
        }
        if let Some(end) = self.end {
            if end < self.start {
                return Err(invalid(format!(
                    "end {} is before start {}",
                    end.to_rfc3339(),
                    self.start.to_rfc3339()
                )));
            }
        }
        Ok(())
    }
}

/// `null` reads as the type's default, like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Recurrence object as stored by the content backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct Recurrence {
    pub is_recurring: bool,
    pub frequency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub days_of_week: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    /// Fields that were present but unreadable. A rule with problems never expands.
    #[serde(skip)]
    pub problems: Vec<String>,
}

impl From<Value> for Recurrence {
    fn from(value: Value) -> Self {
        let mut recurrence = Recurrence::default();
        let fields = match value {
            Value::Object(fields) => fields,
            Value::Null => return recurrence,
            other => {
                recurrence.is_recurring = true;
                recurrence
                    .problems
                    .push(format!("recurrence must be an object, got {}", other));
                return recurrence;
            }
        };

        let field = |name: &str| fields.get(name).filter(|v| !v.is_null());
        let mut problems = Vec::new();

        recurrence.is_recurring = match field("isRecurring") {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
            Some(other) => {
                problems.push(format!("isRecurring must be a boolean, got {}", other));
                true
            }
        };

        match field("frequency") {
            None => {}
            Some(Value::String(s)) => recurrence.frequency = s.clone(),
            Some(other) => problems.push(format!("frequency must be a string, got {}", other)),
        }

        recurrence.interval = read_count(field("interval"), "interval", &mut problems);
        recurrence.count = read_count(field("count"), "count", &mut problems);

        match field("daysOfWeek") {
            None => {}
            Some(Value::Array(days)) => {
                for day in days {
                    match day {
                        Value::String(s) => recurrence.days_of_week.push(s.clone()),
                        Value::Null => {}
                        other => {
                            problems.push(format!("daysOfWeek entries must be strings, got {}", other))
                        }
                    }
                }
            }
            Some(Value::String(s)) => recurrence
                .days_of_week
                .extend(s.split(',').map(str::trim).filter(|d| !d.is_empty()).map(str::to_string)),
            Some(other) => problems.push(format!("daysOfWeek must be a list, got {}", other)),
        }

        match field("until") {
            None => {}
            Some(Value::String(s)) => match parse_until(s) {
                Some(until) => recurrence.until = Some(until),
                None => problems.push(format!("until is not a date or timestamp: {:?}", s)),
            },
            Some(other) => problems.push(format!("until must be a string, got {}", other)),
        }

        recurrence.problems = problems;
        recurrence
    }
}

/// A non-negative whole number, given as a JSON number or a numeric string.
fn read_count(value: Option<&Value>, name: &str, problems: &mut Vec<String>) -> Option<u32> {
    let parsed = match value? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        problems.push(format!(
            "{} must be a whole number, got {}",
            name,
            value.map(Value::to_string).unwrap_or_default()
        ));
    }
    parsed
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date meaning the end of that day (UTC).
fn parse_until(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)?;
    Some(date.and_time(end_of_day).and_utc())
}

impl Recurrence {
    /// Validate the loose record into a [`RecurrenceRule`].
    ///
    /// # Errors
    /// - [`CalendarError::UnknownFrequency`] for a frequency token outside the closed set.
    /// - [`CalendarError::UnknownWeekday`] for an unreadable `daysOfWeek` entry.
    /// - [`CalendarError::InvalidRule`] for `interval = 0` or fields that could not be read.
    pub fn parse(&self) -> Result<RecurrenceRule> {
        if !self.problems.is_empty() {
            return Err(CalendarError::InvalidRule(self.problems.join("; ")));
        }
        let frequency: Frequency = self.frequency.parse()?;

        let interval = self.interval.unwrap_or(1);
        if interval == 0 {
            return Err(CalendarError::InvalidRule(
                "interval must be at least 1".to_string(),
            ));
        }

        let mut weekdays = self
            .days_of_week
            .iter()
            .map(|token| parse_weekday(token))
            .collect::<Result<Vec<_>>>()?;
        weekdays.sort_by_key(|day| day.num_days_from_monday());
        weekdays.dedup();

        Ok(RecurrenceRule {
            frequency,
            interval,
            weekdays,
            count: self.count,
            until: self.until,
        })
    }
}

/// Closed set of recurrence periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// RFC 5545 `FREQ` value.
    pub fn as_rrule(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl FromStr for Frequency {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" | "annually" => Ok(Frequency::Yearly),
            _ => Err(CalendarError::UnknownFrequency(s.to_string())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_rrule().to_ascii_lowercase())
    }
}

/// Parse a weekday token: `monday`, `mon`, or the RFC 5545 code `MO`.
pub fn parse_weekday(token: &str) -> Result<Weekday> {
    let day = match token.trim().to_ascii_lowercase().as_str() {
        "mo" | "mon" | "monday" => Weekday::Mon,
        "tu" | "tue" | "tuesday" => Weekday::Tue,
        "we" | "wed" | "wednesday" => Weekday::Wed,
        "th" | "thu" | "thursday" => Weekday::Thu,
        "fr" | "fri" | "friday" => Weekday::Fri,
        "sa" | "sat" | "saturday" => Weekday::Sat,
        "su" | "sun" | "sunday" => Weekday::Sun,
        _ => return Err(CalendarError::UnknownWeekday(token.to_string())),
    };
    Ok(day)
}

/// RFC 5545 `BYDAY` code for a weekday.
pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// A validated recurrence rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Step between occurrences in units of `frequency`, at least 1.
    pub interval: u32,
    /// Weekday filter, Monday-first and deduplicated. Only read for weekly rules.
    pub weekdays: Vec<Weekday>,
    pub count: Option<u32>,
    /// Inclusive upper bound on occurrence starts.
    pub until: Option<DateTime<Utc>>,
}

/// One concrete calendar instance of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// True when produced by expanding a recurrence rule.
    pub recurring: bool,
}

impl Occurrence {
    /// The event itself as a single occurrence.
    pub fn from_event(event: &Event) -> Self {
        Self::at(event, event.start, event.duration(), false)
    }

    /// An occurrence of `event` starting at `start` and lasting `duration`.
    pub fn at(event: &Event, start: DateTime<Utc>, duration: Duration, recurring: bool) -> Self {
        Self {
            id: event.id.clone(),
            slug: event.slug.clone(),
            title: event.title.clone(),
            start,
            end: start + duration,
            all_day: event.all_day,
            location: event.location.clone(),
            description: event.description.clone(),
            recurring,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Decode raw backend records into events.
///
/// Fails on the first record that does not match the event shape or breaks the
/// contract checked by [`Event::validate`]; the error names that record.
pub fn decode_events(records: Vec<serde_json::Value>) -> Result<Vec<Event>> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| decode_event(index, record))
        .collect()
}

/// Decode a single raw record. `index` is only used for error reporting.
pub fn decode_event(index: usize, record: serde_json::Value) -> Result<Event> {
    let id = record
        .get("id")
        .or_else(|| record.get("_id"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);

    let event: Event =
        serde_json::from_value(record).map_err(|e| CalendarError::InvalidEvent {
            index,
            id,
            reason: e.to_string(),
        })?;
    event.validate(index)?;
    Ok(event)
}
