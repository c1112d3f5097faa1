//! Recurrence expansion -- turns events with a recurrence rule into concrete occurrences.
//!
//! Wraps the `rrule` crate (v0.13) and `chrono-tz`. Rules are evaluated in the
//! calendar's wall-clock timezone, so a weekly 17:00 event stays at 17:00 local
//! time across DST changes and weekday filters refer to local weekdays.
//!
//! A rule with neither `count` nor `until` is still finite: every recurring
//! event is capped at [`ExpandOptions::max_occurrences`] instances
//! ([`MAX_OCCURRENCES`] by default).

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, SubsecRound, TimeZone, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use serde::Serialize;

use crate::error::{CalendarError, Result};
use crate::event::{weekday_code, Event, Frequency, Occurrence, RecurrenceRule};

/// Default per-event cap on generated occurrences. 500 covers well over a year
/// of a daily rule and nearly a decade of a weekly one.
pub const MAX_OCCURRENCES: u16 = 500;

/// Parameters shared by every expansion in a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpandOptions {
    /// Zone whose wall-clock time the rules are evaluated in.
    pub timezone: Tz,
    /// Hard cap on occurrences per recurring event.
    pub max_occurrences: u16,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            max_occurrences: MAX_OCCURRENCES,
        }
    }
}

impl ExpandOptions {
    /// Options for an IANA timezone name, e.g. `"America/Chicago"`.
    ///
    /// # Errors
    /// Returns [`CalendarError::InvalidTimezone`] if the name is not a known zone.
    pub fn for_timezone(timezone: &str) -> Result<Self> {
        let timezone: Tz = timezone
            .parse()
            .map_err(|_| CalendarError::InvalidTimezone(timezone.to_string()))?;
        Ok(Self {
            timezone,
            ..Self::default()
        })
    }

    pub fn with_max_occurrences(mut self, max_occurrences: u16) -> Self {
        self.max_occurrences = max_occurrences;
        self
    }
}

/// A recurrence rule that could not be expanded. The event was emitted unexpanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRule {
    pub event_id: String,
    pub reason: String,
}

/// Expansion of a single event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventExpansion {
    /// Chronologically ordered occurrences.
    pub occurrences: Vec<Occurrence>,
    pub rejected: Option<RejectedRule>,
}

/// Expansion of a batch of events.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expansion {
    /// Source order, then chronological within each source event.
    pub occurrences: Vec<Occurrence>,
    pub rejected: Vec<RejectedRule>,
}

/// Expand every event of a batch into calendar occurrences.
///
/// Non-recurring events pass through as one occurrence. A recurring event whose
/// rule is malformed or unsupported is emitted once, unexpanded, logged, and
/// listed in [`Expansion::rejected`]; the rest of the batch is unaffected.
///
/// # Errors
/// Returns [`CalendarError::InvalidEvent`] naming the first record that breaks
/// the event contract (see [`Event::validate`]).
pub fn expand_events(events: &[Event], options: &ExpandOptions) -> Result<Expansion> {
    let mut expansion = Expansion::default();

    for (index, event) in events.iter().enumerate() {
        event.validate(index)?;
        let expanded = expand_checked(event, options);
        expansion.occurrences.extend(expanded.occurrences);
        expansion.rejected.extend(expanded.rejected);
    }

    Ok(expansion)
}

/// Expand a single event. See [`expand_events`].
///
/// # Errors
/// Returns [`CalendarError::InvalidEvent`] if the event breaks the event contract.
pub fn expand_event(event: &Event, options: &ExpandOptions) -> Result<EventExpansion> {
    event.validate(0)?;
    Ok(expand_checked(event, options))
}

fn expand_checked(event: &Event, options: &ExpandOptions) -> EventExpansion {
    let Some(recurrence) = event.active_recurrence() else {
        return EventExpansion {
            occurrences: vec![Occurrence::from_event(event)],
            rejected: None,
        };
    };

    let duration = event.duration();
    let starts = recurrence
        .parse()
        .and_then(|rule| expand_rule(event.start, &rule, options));

    match starts {
        Ok(starts) => EventExpansion {
            occurrences: starts
                .into_iter()
                .map(|start| Occurrence::at(event, start, duration, true))
                .collect(),
            rejected: None,
        },
        Err(err) => {
            tracing::warn!(
                event_id = %event.id,
                error = %err,
                "recurrence rule rejected, emitting event unexpanded"
            );
            EventExpansion {
                occurrences: vec![Occurrence::from_event(event)],
                rejected: Some(RejectedRule {
                    event_id: event.id.clone(),
                    reason: err.to_string(),
                }),
            }
        }
    }
}

/// Generate the start instants of a rule anchored at `start`.
///
/// Instants are chronological, never earlier than `start`, never later than
/// `rule.until`, and at most `min(rule.count, options.max_occurrences)` long.
///
/// # Errors
/// Returns [`CalendarError::InvalidRule`] if the rule has a zero interval or the
/// `rrule` crate rejects the assembled rule.
pub fn expand_rule(
    start: DateTime<Utc>,
    rule: &RecurrenceRule,
    options: &ExpandOptions,
) -> Result<Vec<DateTime<Utc>>> {
    if rule.interval == 0 {
        return Err(CalendarError::InvalidRule(
            "interval must be at least 1".to_string(),
        ));
    }

    // COUNT is applied through the result limit rather than in the RRULE text,
    // so that COUNT and UNTIL can both bound the same rule.
    let limit = match rule.count {
        Some(count) => u16::try_from(count)
            .unwrap_or(u16::MAX)
            .min(options.max_occurrences),
        None => options.max_occurrences,
    };
    if limit == 0 {
        return Ok(Vec::new());
    }
    if matches!(rule.until, Some(until) if until < start) {
        return Ok(Vec::new());
    }

    let tz = options.timezone;

    // iCalendar text has whole seconds; the remainder is added back to every instance.
    let whole_start = start.trunc_subsecs(0);
    let subsec = start - whole_start;
    let local_start = whole_start.with_timezone(&tz).naive_local();
    // rrule refuses a DTSTART inside a DST fold. Such a rule is expanded from the
    // same wall-clock time moved out of the fold, and moved back afterwards.
    let shift = fold_shift(tz, local_start);

    let mut rrule_str = format!("FREQ={};INTERVAL={}", rule.frequency.as_rrule(), rule.interval);

    if !rule.weekdays.is_empty() {
        if rule.frequency == Frequency::Weekly {
            let codes: Vec<&str> = rule.weekdays.iter().map(|d| weekday_code(*d)).collect();
            rrule_str.push_str(&format!(";BYDAY={}", codes.join(",")));
        } else {
            tracing::debug!(
                frequency = %rule.frequency,
                "daysOfWeek only applies to weekly rules, ignoring"
            );
        }
    }

    // The rrule crate requires UNTIL and DTSTART to share a timezone: UTC
    // UNTIL values carry a trailing "Z", other zones use bare local time.
    if let Some(until) = rule.until {
        if tz == Tz::UTC {
            rrule_str.push_str(&format!(";UNTIL={}", until.format("%Y%m%dT%H%M%SZ")));
        } else {
            let until_local = until.with_timezone(&tz).naive_local() + shift;
            // An UNTIL that is itself ambiguous is left to the filter below.
            if tz.from_local_datetime(&until_local).single().is_some() {
                rrule_str.push_str(&format!(";UNTIL={}", until_local.format("%Y%m%dT%H%M%S")));
            }
        }
    }

    let dtstart_ical = (local_start + shift).format("%Y%m%dT%H%M%S");
    let rrule_text = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        tz.name(),
        dtstart_ical,
        rrule_str
    );

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| CalendarError::InvalidRule(format!("{}", e)))?;

    // One extra instance so that filtering below can never leave the result short.
    let instances = rrule_set.all(limit.saturating_add(1));

    let starts: Vec<DateTime<Utc>> = instances
        .dates
        .into_iter()
        .map(|dt| {
            let instant = if shift.is_zero() {
                dt.with_timezone(&Utc)
            } else {
                let local = dt.naive_local() - shift;
                if local == local_start {
                    whole_start
                } else {
                    tz.from_local_datetime(&local)
                        .earliest()
                        .map(|t| t.with_timezone(&Utc))
                        .unwrap_or_else(|| dt.with_timezone(&Utc) - shift)
                }
            };
            instant + subsec
        })
        .filter(|s| *s >= start && rule.until.is_none_or(|until| *s <= until))
        .take(usize::from(limit))
        .collect();

    if rule.count.is_none() && starts.len() == usize::from(limit) {
        tracing::debug!(
            cap = limit,
            "recurrence expansion stopped at the occurrence cap"
        );
    }

    Ok(starts)
}

/// Wall-clock offset that moves an ambiguous local time out of its DST fold
/// without changing its date. Zero for every other local time.
fn fold_shift(tz: Tz, local: NaiveDateTime) -> Duration {
    let LocalResult::Ambiguous(earlier, later) = tz.from_local_datetime(&local) else {
        return Duration::zero();
    };
    let width = (later - earlier).abs();
    if (local + width).date() == local.date() {
        width
    } else {
        -width
    }
}
