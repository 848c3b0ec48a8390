//! Attendance statistics derived from the document. Nothing here mutates it.

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::{parse_date_key, AttendanceRecord};
use crate::roster::Roster;

pub const GOOD_ATTENDANCE_PERCENT: f64 = 75.0;

#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    /// `None` means every subject.
    pub subject: Option<String>,
    /// Inclusive bounds.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl StatsFilter {
    fn includes_date(&self, date: &str) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(d) = parse_date_key(date) else {
            return false;
        };
        self.from.map_or(true, |from| d >= from) && self.to.map_or(true, |to| d <= to)
    }

    fn includes_subject(&self, subject: &str) -> bool {
        self.subject.as_deref().map_or(true, |s| s == subject)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttendanceStats {
    pub attended: u32,
    pub total: u32,
    pub percentage: f64,
}

impl AttendanceStats {
    fn from_counts(attended: u32, total: u32) -> Self {
        let percentage = if total > 0 {
            f64::from(attended) / f64::from(total) * 100.0
        } else {
            0.0
        };
        Self {
            attended,
            total,
            percentage,
        }
    }

    pub fn rounded_percentage(&self) -> u32 {
        self.percentage.round() as u32
    }

    pub fn is_good(&self) -> bool {
        f64::from(self.rounded_percentage()) >= GOOD_ATTENDANCE_PERCENT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    pub date: String,
    pub subject: String,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentReport {
    pub stats: AttendanceStats,
    pub rows: Vec<DetailRow>,
}

/// Counts every recorded date+subject session matching `filter` for one student.
/// Subjects outside the roster's list are ignored. Rows come newest date first,
/// subjects in roster order.
pub fn aggregate(
    doc: &AttendanceRecord,
    roster: &Roster,
    roll_no: &str,
    filter: &StatsFilter,
) -> StudentReport {
    let mut attended = 0;
    let mut total = 0;
    let mut rows = Vec::new();

    for date in doc.dates_newest_first() {
        if !filter.includes_date(date) {
            continue;
        }
        let Some(day) = doc.day(date) else { continue };
        for subject in roster.subjects() {
            if !filter.includes_subject(subject) {
                continue;
            }
            let Some(present) = day.get(subject) else {
                continue;
            };
            total += 1;
            let status = if present.iter().any(|r| r == roll_no) {
                attended += 1;
                Status::Present
            } else {
                Status::Absent
            };
            rows.push(DetailRow {
                date: date.clone(),
                subject: subject.clone(),
                status,
            });
        }
    }

    StudentReport {
        stats: AttendanceStats::from_counts(attended, total),
        rows,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewRow {
    pub roll_no: String,
    pub name: String,
    pub percentage: u32,
}

/// One row per roster student over every recorded session.
pub fn class_overview(doc: &AttendanceRecord, roster: &Roster) -> Vec<OverviewRow> {
    let all = StatsFilter::default();
    roster
        .students()
        .iter()
        .map(|s| OverviewRow {
            roll_no: s.roll_no.clone(),
            name: s.name.clone(),
            percentage: aggregate(doc, roster, &s.roll_no, &all)
                .stats
                .rounded_percentage(),
        })
        .collect()
}
