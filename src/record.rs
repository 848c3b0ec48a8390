//! The attendance document: date -> subject -> roll numbers present.
//!
//! A missing date means no attendance was taken that day, a missing subject under a
//! date means that subject was not taken, and an empty list means everyone was absent.
//! The three states stay distinct through every operation here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::roster::Roster;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub type SubjectMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendanceRecord(BTreeMap<String, SubjectMap>);

/// How a `put` combines the incoming document with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    Merge,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Replace => f.write_str("replace"),
            WriteMode::Merge => f.write_str("merge"),
        }
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(WriteMode::Replace),
            "merge" => Ok(WriteMode::Merge),
            other => Err(format!("unknown write mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    BadDate(String),
    UnknownSubject { date: String, subject: String },
    UnknownRollNo { date: String, subject: String, roll_no: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::BadDate(date) => write!(f, "date key {date:?} is not YYYY-MM-DD"),
            Violation::UnknownSubject { date, subject } => {
                write!(f, "{date}: unknown subject {subject:?}")
            }
            Violation::UnknownRollNo {
                date,
                subject,
                roll_no,
            } => write!(f, "{date}/{subject}: unknown roll number {roll_no:?}"),
        }
    }
}

impl Violation {
    /// Unknown roll numbers are dangling references and block a strict write. Odd
    /// date keys and subjects outside the roster list are only reported.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Violation::UnknownRollNo { .. })
    }
}

pub fn parse_date_key(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

impl AttendanceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn date_count(&self) -> usize {
        self.0.len()
    }

    pub fn dates(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn day(&self, date: &str) -> Option<&SubjectMap> {
        self.0.get(date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SubjectMap)> {
        self.0.iter()
    }

    /// `None` when attendance was not taken for that date+subject.
    pub fn present_list(&self, date: &str, subject: &str) -> Option<&[String]> {
        self.0
            .get(date)
            .and_then(|day| day.get(subject))
            .map(Vec::as_slice)
    }

    pub fn is_present(&self, date: &str, subject: &str, roll_no: &str) -> bool {
        self.present_list(date, subject)
            .map(|list| list.iter().any(|r| r == roll_no))
            .unwrap_or(false)
    }

    pub fn set_present_list(&mut self, date: &str, subject: &str, present: Vec<String>) {
        self.0
            .entry(date.to_string())
            .or_default()
            .insert(subject.to_string(), present);
    }

    /// Copy of `self` with one date+subject list replaced; other subjects under the
    /// same date are kept.
    pub fn with_present_list(&self, date: &str, subject: &str, present: Vec<String>) -> Self {
        let mut updated = self.clone();
        updated.set_present_list(date, subject, present);
        updated
    }

    /// Adds `roll_no` when `present` and it is missing, removes its first occurrence
    /// otherwise. Creates the date+subject entry if needed.
    pub fn toggle(&mut self, date: &str, subject: &str, roll_no: &str, present: bool) {
        let list = self
            .0
            .entry(date.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_default();
        let idx = list.iter().position(|r| r == roll_no);
        match (present, idx) {
            (true, None) => list.push(roll_no.to_string()),
            (false, Some(i)) => {
                list.remove(i);
            }
            _ => {}
        }
    }

    /// Removes one subject and prunes the date when nothing is left under it.
    /// Returns whether the subject existed.
    pub fn remove_subject(&mut self, date: &str, subject: &str) -> bool {
        let Some(day) = self.0.get_mut(date) else {
            return false;
        };
        let removed = day.remove(subject).is_some();
        if day.is_empty() {
            self.0.remove(date);
        }
        removed
    }

    /// Overlay used by merge writes: dates in `incoming` are merged subject by
    /// subject, present-lists are replaced wholesale, nothing is ever removed.
    pub fn merge_from(&mut self, incoming: AttendanceRecord) {
        for (date, subjects) in incoming.0 {
            let day = self.0.entry(date).or_default();
            for (subject, present) in subjects {
                day.insert(subject, present);
            }
        }
    }

    /// Dates sorted newest first. Keys that do not parse sort after the dated ones.
    pub fn dates_newest_first(&self) -> Vec<&String> {
        let mut dates: Vec<&String> = self.0.keys().collect();
        dates.sort_by(|a, b| match (parse_date_key(a), parse_date_key(b)) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        });
        dates
    }

    pub fn validate(&self, roster: &Roster) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (date, subjects) in &self.0 {
            if parse_date_key(date).is_none() {
                violations.push(Violation::BadDate(date.clone()));
            }
            for (subject, present) in subjects {
                if !roster.has_subject(subject) {
                    violations.push(Violation::UnknownSubject {
                        date: date.clone(),
                        subject: subject.clone(),
                    });
                }
                for roll_no in present {
                    if !roster.has_student(roll_no) {
                        violations.push(Violation::UnknownRollNo {
                            date: date.clone(),
                            subject: subject.clone(),
                            roll_no: roll_no.clone(),
                        });
                    }
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: serde_json::Value) -> AttendanceRecord {
        serde_json::from_value(v).expect("record json")
    }

    #[test]
    fn empty_list_is_distinct_from_missing_subject() {
        let doc = record(json!({"2024-01-01": {"Mathematics": []}}));
        assert_eq!(doc.present_list("2024-01-01", "Mathematics"), Some(&[][..]));
        assert_eq!(doc.present_list("2024-01-01", "Physics"), None);
        assert_eq!(doc.present_list("2024-01-02", "Mathematics"), None);
    }

    #[test]
    fn non_object_payloads_are_rejected() {
        assert!(AttendanceRecord::from_json_slice(b"[1,2]").is_err());
        assert!(AttendanceRecord::from_json_slice(b"{\"2024-01-01\": 3}").is_err());
        assert!(AttendanceRecord::from_json_slice(b"not json").is_err());
    }

    #[test]
    fn duplicates_in_present_list_survive() {
        let doc = record(json!({"2024-01-01": {"Physics": ["101", "101"]}}));
        let back = serde_json::to_value(&doc).expect("to json");
        assert_eq!(back, json!({"2024-01-01": {"Physics": ["101", "101"]}}));
    }

    #[test]
    fn remove_last_subject_prunes_date() {
        let mut doc = record(json!({
            "2024-01-01": {"Physics": ["101"]},
            "2024-01-02": {"Physics": [], "English": ["102"]}
        }));
        assert!(doc.remove_subject("2024-01-01", "Physics"));
        assert!(doc.day("2024-01-01").is_none());
        assert!(doc.remove_subject("2024-01-02", "Physics"));
        assert!(doc.day("2024-01-02").is_some());
        assert!(!doc.remove_subject("2024-01-09", "Physics"));
    }

    #[test]
    fn merge_keeps_untouched_dates_and_subjects() {
        let mut stored = record(json!({
            "2024-01-01": {"Physics": ["101"], "English": ["102"]},
            "2024-01-02": {"Physics": ["103"]}
        }));
        stored.merge_from(record(json!({"2024-01-01": {"Physics": []}})));
        assert_eq!(
            serde_json::to_value(&stored).expect("json"),
            json!({
                "2024-01-01": {"Physics": [], "English": ["102"]},
                "2024-01-02": {"Physics": ["103"]}
            })
        );
    }

    #[test]
    fn toggle_adds_and_removes_membership() {
        let mut doc = AttendanceRecord::new();
        doc.toggle("2024-03-04", "English", "101", true);
        doc.toggle("2024-03-04", "English", "101", true);
        doc.toggle("2024-03-04", "English", "102", true);
        assert_eq!(
            doc.present_list("2024-03-04", "English"),
            Some(&["101".to_string(), "102".to_string()][..])
        );
        doc.toggle("2024-03-04", "English", "101", false);
        doc.toggle("2024-03-04", "English", "105", false);
        assert_eq!(
            doc.present_list("2024-03-04", "English"),
            Some(&["102".to_string()][..])
        );
    }

    #[test]
    fn validate_reports_each_violation() {
        let roster = Roster::builtin();
        let doc = record(json!({
            "2024-13-40": {"Physics": ["101"]},
            "2024-01-01": {"Alchemy": ["999"]}
        }));
        let violations = doc.validate(&roster);
        assert_eq!(violations.len(), 3);
        assert!(violations.contains(&Violation::BadDate("2024-13-40".to_string())));
        let blocking: Vec<_> = violations.iter().filter(|v| v.is_blocking()).collect();
        assert_eq!(blocking.len(), 1);
        assert!(violations.contains(&Violation::UnknownRollNo {
            date: "2024-01-01".to_string(),
            subject: "Alchemy".to_string(),
            roll_no: "999".to_string(),
        }));
    }

    #[test]
    fn newest_dates_first() {
        let doc = record(json!({
            "2024-01-02": {},
            "2023-12-31": {},
            "2024-02-01": {}
        }));
        let order: Vec<&str> = doc.dates_newest_first().into_iter().map(String::as_str).collect();
        assert_eq!(order, vec!["2024-02-01", "2024-01-02", "2023-12-31"]);
    }

    #[test]
    fn write_mode_parses_case_insensitively() {
        assert_eq!("Replace".parse::<WriteMode>(), Ok(WriteMode::Replace));
        assert_eq!(" merge ".parse::<WriteMode>(), Ok(WriteMode::Merge));
        assert!("upsert".parse::<WriteMode>().is_err());
    }
}
