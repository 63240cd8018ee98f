//! Data models for UIMS payloads.
//!
//! The cache stores payloads verbatim and never checks their shape; these
//! types are lenient views used for display only:
//!
//! - `AttendanceRecord`, `AttendanceEntry`: per-course summary and the rows
//!   of its full report
//! - `TimetableEntry`, `Weekday`: weekly schedule

pub mod attendance;
pub mod timetable;

pub use attendance::{parse_attendance, AttendanceEntry, AttendanceRecord, AttendanceStatus};
pub use timetable::{parse_timetable, TimetableEntry, Weekday};

use serde::{Deserialize, Deserializer};

/// UIMS sends counts and percentages as strings or numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<NumberOrString> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::Text(s)) => s.trim().trim_end_matches('%').parse().ok(),
        None => None,
    })
}
