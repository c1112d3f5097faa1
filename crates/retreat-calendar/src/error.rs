//! Error types for retreat-calendar operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Unknown recurrence frequency: {0:?}")]
    UnknownFrequency(String),

    #[error("Unknown weekday: {0:?}")]
    UnknownWeekday(String),

    #[error("Invalid calendar range: {0:?}, expected upcoming, past or all")]
    InvalidRange(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// A record that breaks the event contract. `index` is the record's
    /// position in the batch it arrived in, `id` is present when it could be read.
    #[error("Invalid event record #{index} (id: {}): {reason}", .id.as_deref().unwrap_or("<unknown>"))]
    InvalidEvent {
        index: usize,
        id: Option<String>,
        reason: String,
    },

    #[error("Expansion error: {0}")]
    Expansion(String),
}

pub type Result<T> = std::result::Result<T, CalendarError>;
