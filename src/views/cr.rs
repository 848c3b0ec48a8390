use std::collections::HashMap;

use chrono::NaiveDate;

use super::{AttendanceApi, Notice, ViewError};
use crate::record::{date_key, AttendanceRecord};
use crate::roster::Roster;
use crate::session::{Role, Session};
use crate::stats::{class_overview, OverviewRow};

/// CR attendance sheet for one date+subject at a time.
///
/// Checkbox state is derived from the loaded document whenever the selection
/// changes, so edits that were not saved are dropped on navigation.
pub struct MarkingSession<'a, A: AttendanceApi> {
    api: &'a A,
    roster: &'a Roster,
    doc: AttendanceRecord,
    date: NaiveDate,
    subject: String,
    marks: HashMap<String, bool>,
}

impl<'a, A: AttendanceApi> MarkingSession<'a, A> {
    pub fn open(
        api: &'a A,
        roster: &'a Roster,
        session: &Session,
        date: NaiveDate,
        subject: &str,
    ) -> Result<Self, ViewError> {
        session.require(Role::Cr)?;
        if !roster.has_subject(subject) {
            return Err(ViewError::UnknownSubject(subject.to_string()));
        }
        let doc = api.fetch().map_err(|e| {
            ViewError::api(
                "Could not load attendance data. Please check your connection or backend setup.",
                e,
            )
        })?;
        let mut sheet = Self {
            api,
            roster,
            doc,
            date,
            subject: subject.to_string(),
            marks: HashMap::new(),
        };
        sheet.derive_marks();
        Ok(sheet)
    }

    fn derive_marks(&mut self) {
        let key = date_key(self.date);
        self.marks = self
            .roster
            .students()
            .iter()
            .map(|s| {
                let present = self.doc.is_present(&key, &self.subject, &s.roll_no);
                (s.roll_no.clone(), present)
            })
            .collect();
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn document(&self) -> &AttendanceRecord {
        &self.doc
    }

    pub fn select(&mut self, date: NaiveDate, subject: &str) -> Result<(), ViewError> {
        if !self.roster.has_subject(subject) {
            return Err(ViewError::UnknownSubject(subject.to_string()));
        }
        self.date = date;
        self.subject = subject.to_string();
        self.derive_marks();
        Ok(())
    }

    pub fn toggle(&mut self, roll_no: &str, present: bool) -> Result<(), ViewError> {
        match self.marks.get_mut(roll_no) {
            Some(mark) => {
                *mark = present;
                Ok(())
            }
            None => Err(ViewError::UnknownStudent(roll_no.to_string())),
        }
    }

    pub fn is_marked(&self, roll_no: &str) -> bool {
        self.marks.get(roll_no).copied().unwrap_or(false)
    }

    pub fn present_count(&self) -> usize {
        self.marks.values().filter(|m| **m).count()
    }

    pub fn total_students(&self) -> usize {
        self.roster.students().len()
    }

    /// Roll numbers currently ticked, in roster order.
    pub fn present_list(&self) -> Vec<String> {
        self.roster
            .students()
            .iter()
            .filter(|s| self.is_marked(&s.roll_no))
            .map(|s| s.roll_no.clone())
            .collect()
    }

    pub fn save(&mut self) -> Result<Notice, ViewError> {
        let key = date_key(self.date);
        let updated = self
            .doc
            .with_present_list(&key, &self.subject, self.present_list());
        self.api
            .save(&updated)
            .map_err(|e| ViewError::api("Could not save attendance. Please try again.", e))?;
        self.doc = updated;
        Ok(Notice::success(
            "Attendance Saved",
            format!(
                "Attendance for {} on {} has been successfully saved.",
                self.subject,
                self.date.format("%B %-d, %Y")
            ),
        ))
    }

    /// Takes the document handed back by the manage dialog.
    pub fn replace_document(&mut self, doc: AttendanceRecord) {
        self.doc = doc;
        self.derive_marks();
    }

    pub fn overview(&self) -> Vec<OverviewRow> {
        class_overview(&self.doc, self.roster)
    }
}
