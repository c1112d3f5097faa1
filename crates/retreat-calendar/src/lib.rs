//! # retreat-calendar
//!
//! Event model and deterministic recurrence expansion for the retreat-house
//! calendar.
//!
//! Events arrive from the content backend as loosely typed records. This crate
//! decodes them, validates recurrence rules into a closed form, and expands
//! recurring events into concrete occurrences with the `rrule` crate. Expansion
//! is pure: no I/O, no clock reads. Anything time-relative takes a
//! caller-supplied `now`.
//!
//! ## Modules
//!
//! - [`event`]: `Event`, `Recurrence`, `RecurrenceRule`, `Occurrence`, record decoding
//! - [`expander`]: events → occurrences, with per-event fallback and a safety cap
//! - [`range`]: upcoming / past / all selection
//! - [`error`]: Error types

pub mod error;
pub mod event;
pub mod expander;
pub mod range;

pub use error::CalendarError;
pub use event::{decode_events, Event, Frequency, Occurrence, Recurrence, RecurrenceRule};
pub use expander::{
    expand_event, expand_events, expand_rule, EventExpansion, ExpandOptions, Expansion,
    RejectedRule, MAX_OCCURRENCES,
};
pub use range::{filter_occurrences, next_occurrence, CalendarRange};
