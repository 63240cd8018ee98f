use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    Unknown,
}

impl Weekday {
    /// Accepts full names and three-letter abbreviations, any case.
    pub fn parse(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        match lower.get(..3).unwrap_or(lower.as_str()) {
            "mon" => Weekday::Monday,
            "tue" => Weekday::Tuesday,
            "wed" => Weekday::Wednesday,
            "thu" => Weekday::Thursday,
            "fri" => Weekday::Friday,
            "sat" => Weekday::Saturday,
            "sun" => Weekday::Sunday,
            _ => Weekday::Unknown,
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
            Weekday::Sunday => "Sun",
            Weekday::Unknown => "---",
        }
    }
}

/// One lecture slot in the weekly timetable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimetableEntry {
    #[serde(rename = "Day", alias = "day", default)]
    pub day: Option<String>,
    #[serde(rename = "Time", alias = "time", alias = "Timing", default)]
    pub time: Option<String>,
    #[serde(rename = "Course", alias = "course", alias = "Subject", alias = "Title", default)]
    pub course: Option<String>,
    #[serde(rename = "Room", alias = "room", default)]
    pub room: Option<String>,
    #[serde(rename = "Teacher", alias = "teacher", alias = "Faculty", default)]
    pub teacher: Option<String>,
}

impl TimetableEntry {
    pub fn weekday(&self) -> Weekday {
        self.day.as_deref().map(Weekday::parse).unwrap_or(Weekday::Unknown)
    }
}

/// Read timetable entries out of a cached payload.
///
/// Two layouts are understood: a flat array of entries, or an object
/// keyed by day name whose values are arrays of entries (the key fills
/// in a missing `Day`). Results are ordered by weekday, then time.
pub fn parse_timetable(payload: &Value) -> Vec<TimetableEntry> {
    let mut entries = Vec::new();

    match payload {
        Value::Array(items) => collect_entries(items, None, &mut entries),
        Value::Object(days) => {
            for (day, items) in days {
                match items.as_array() {
                    Some(items) => collect_entries(items, Some(day.as_str()), &mut entries),
                    None => debug!(day = %day, "Timetable day is not an array"),
                }
            }
        }
        _ => debug!("Timetable payload is neither array nor object"),
    }

    entries.sort_by(|a, b| {
        a.weekday()
            .cmp(&b.weekday())
            .then_with(|| a.time.cmp(&b.time))
    });
    entries
}

fn collect_entries(items: &[Value], day: Option<&str>, out: &mut Vec<TimetableEntry>) {
    for item in items {
        match TimetableEntry::deserialize(item) {
            Ok(mut entry) => {
                if entry.day.is_none() {
                    entry.day = day.map(str::to_string);
                }
                out.push(entry);
            }
            Err(e) => debug!(error = %e, "Skipping unreadable timetable entry"),
        }
    }
}
