use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::lenient_number;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Other(String),
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "Present"),
            AttendanceStatus::Absent => write!(f, "Absent"),
            AttendanceStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One course in the attendance summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(rename = "Code", default)]
    pub code: Option<String>,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "TotalDelv", default, deserialize_with = "lenient_number")]
    pub delivered: Option<f64>,
    #[serde(rename = "TotalAttd", default, deserialize_with = "lenient_number")]
    pub attended: Option<f64>,
    #[serde(rename = "TotalPercentage", default, deserialize_with = "lenient_number")]
    pub total_percentage: Option<f64>,
    #[serde(rename = "EligibilityPercentage", default, deserialize_with = "lenient_number")]
    pub eligibility_percentage: Option<f64>,
    /// Opaque course handle used by UIMS to request the full report
    #[serde(rename = "EncryptCode", default)]
    pub encrypt_code: Option<String>,
    /// Present only in the full attendance payload
    #[serde(rename = "FullAttendanceReport", default)]
    pub full_report: Vec<AttendanceEntry>,
}

impl AttendanceRecord {
    /// Reported percentage, or attended/delivered when UIMS omits it.
    pub fn percentage(&self) -> Option<f64> {
        self.total_percentage.or_else(|| match (self.attended, self.delivered) {
            (Some(attended), Some(delivered)) if delivered > 0.0 => {
                Some(attended / delivered * 100.0)
            }
            _ => None,
        })
    }

    pub fn display_title(&self) -> String {
        match (&self.code, &self.title) {
            (Some(code), Some(title)) => format!("{} {}", code, title),
            (None, Some(title)) => title.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "Unknown course".to_string(),
        }
    }

    /// Lectures that can still be missed while staying at or above
    /// `threshold` percent. Negative when already below.
    pub fn margin(&self, threshold: f64) -> Option<i64> {
        let attended = self.attended?;
        let delivered = self.delivered?;
        if threshold <= 0.0 || threshold >= 100.0 {
            return None;
        }
        let ratio = threshold / 100.0;
        if attended / delivered.max(1.0) >= ratio {
            // Largest k with attended / (delivered + k) >= ratio
            Some(((attended / ratio) - delivered).floor() as i64)
        } else {
            // Smallest k with (attended + k) / (delivered + k) >= ratio, negated
            let needed = (ratio * delivered - attended) / (1.0 - ratio);
            Some(-(needed.ceil() as i64))
        }
    }

    pub fn present_count(&self) -> usize {
        self.full_report
            .iter()
            .filter(|e| e.status() == AttendanceStatus::Present)
            .count()
    }
}

/// One row of a course's full attendance report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceEntry {
    #[serde(rename = "AttendanceDate", alias = "Date", alias = "DateOfAttendance", default)]
    pub date: Option<String>,
    #[serde(rename = "Timing", alias = "Time", alias = "TimeSlot", default)]
    pub time: Option<String>,
    #[serde(rename = "Attendance", alias = "Status", alias = "AttendanceStatus", default)]
    pub raw_status: Option<String>,
}

impl AttendanceEntry {
    pub fn status(&self) -> AttendanceStatus {
        match self.raw_status.as_deref().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("p") || s.eq_ignore_ascii_case("present") => {
                AttendanceStatus::Present
            }
            Some(s) if s.eq_ignore_ascii_case("a") || s.eq_ignore_ascii_case("absent") => {
                AttendanceStatus::Absent
            }
            Some(s) => AttendanceStatus::Other(s.to_string()),
            None => AttendanceStatus::Other("-".to_string()),
        }
    }
}

/// Read attendance records out of a cached payload. Works for both the
/// summary and the full payload. Entries that do not look like records
/// are skipped.
pub fn parse_attendance(payload: &Value) -> Vec<AttendanceRecord> {
    let Some(items) = payload.as_array() else {
        debug!("Attendance payload is not an array");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match AttendanceRecord::deserialize(item) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(error = %e, "Skipping unreadable attendance record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_attendance_strings_and_numbers() {
        let payload = json!([
            {"Code": "CST-302", "Title": "COMPUTER GRAPHICS", "TotalDelv": "45", "TotalAttd": "40", "TotalPercentage": "88.89"},
            {"Code": "CST-304", "Title": "OPERATING SYSTEMS", "TotalDelv": 20, "TotalAttd": 15}
        ]);
        let records = parse_attendance(&payload);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].delivered, Some(45.0));
        assert_eq!(records[0].percentage(), Some(88.89));
        assert_eq!(records[1].percentage(), Some(75.0));
        assert_eq!(records[1].display_title(), "CST-304 OPERATING SYSTEMS");
    }

    #[test]
    fn test_parse_attendance_non_array() {
        assert!(parse_attendance(&json!({"d": "[]"})).is_empty());
        assert!(parse_attendance(&Value::Null).is_empty());
    }

    #[test]
    fn test_parse_attendance_skips_bad_records() {
        let payload = json!([42, {"Title": "ETHICS"}]);
        let records = parse_attendance(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].display_title(), "ETHICS");
        assert_eq!(records[0].percentage(), None);
    }

    #[test]
    fn test_full_report_entries() {
        let payload = json!([{
            "Title": "COMPUTER GRAPHICS",
            "FullAttendanceReport": [
                {"AttendanceDate": "01 Aug 2020", "Attendance": "P"},
                {"Date": "02 Aug 2020", "Status": "Absent"},
                {"AttendanceDate": "03 Aug 2020", "Attendance": "ML"}
            ]
        }]);
        let records = parse_attendance(&payload);
        let report = &records[0].full_report;
        assert_eq!(report.len(), 3);
        assert_eq!(report[0].status(), AttendanceStatus::Present);
        assert_eq!(report[1].status(), AttendanceStatus::Absent);
        assert_eq!(report[2].status(), AttendanceStatus::Other("ML".to_string()));
        assert_eq!(records[0].present_count(), 1);
    }

    #[test]
    fn test_margin() {
        let above = AttendanceRecord {
            attended: Some(40.0),
            delivered: Some(45.0),
            ..Default::default()
        };
        // 40 / (45 + 8) = 75.5%, 40 / (45 + 9) = 74.07%
        assert_eq!(above.margin(75.0), Some(8));

        let below = AttendanceRecord {
            attended: Some(10.0),
            delivered: Some(20.0),
            ..Default::default()
        };
        // (10 + 20) / (20 + 20) = 75%
        assert_eq!(below.margin(75.0), Some(-20));
        assert_eq!(below.margin(0.0), None);
    }
}
