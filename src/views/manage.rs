use super::{AttendanceApi, Notice, ViewError};
use crate::record::AttendanceRecord;
use crate::session::{Role, Session};

/// Editable copy of the whole document. Every persisting action writes the full
/// buffer, so deletions only stick when the server replaces rather than merges.
pub struct ManageDialog<'a, A: AttendanceApi> {
    api: &'a A,
    stored: AttendanceRecord,
    buffer: AttendanceRecord,
}

impl<'a, A: AttendanceApi> ManageDialog<'a, A> {
    pub fn open(
        api: &'a A,
        session: &Session,
        records: &AttendanceRecord,
    ) -> Result<Self, ViewError> {
        session.require(Role::Cr)?;
        Ok(Self {
            api,
            stored: records.clone(),
            buffer: records.clone(),
        })
    }

    pub fn buffer(&self) -> &AttendanceRecord {
        &self.buffer
    }

    pub fn dates_newest_first(&self) -> Vec<String> {
        self.buffer
            .dates_newest_first()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Local only; nothing is sent until `save`.
    pub fn toggle(&mut self, date: &str, subject: &str, roll_no: &str, present: bool) {
        self.buffer.toggle(date, subject, roll_no, present);
    }

    pub fn delete_subject(&mut self, date: &str, subject: &str) -> Result<Notice, ViewError> {
        let mut next = self.buffer.clone();
        next.remove_subject(date, subject);
        self.persist(next, "Could not delete the attendance record.")?;
        Ok(Notice::success(
            "Record Deleted",
            format!("{subject} on {date} has been removed."),
        ))
    }

    pub fn clear_all(&mut self) -> Result<Notice, ViewError> {
        self.persist(AttendanceRecord::new(), "Could not clear attendance records.")?;
        Ok(Notice::success(
            "Data Cleared",
            "All attendance records have been deleted.",
        ))
    }

    pub fn save(&mut self) -> Result<Notice, ViewError> {
        self.persist(self.buffer.clone(), "Could not save attendance records.")?;
        Ok(Notice::success(
            "Success",
            "Attendance records updated successfully.",
        ))
    }

    fn persist(&mut self, next: AttendanceRecord, failure: &str) -> Result<(), ViewError> {
        self.api
            .save(&next)
            .map_err(|e| ViewError::api(failure, e))?;
        self.stored = next.clone();
        self.buffer = next;
        Ok(())
    }

    /// The last successfully persisted document, for the dashboard to adopt.
    pub fn into_records(self) -> AttendanceRecord {
        self.stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::record::WriteMode;
    use crate::roster::Roster;
    use crate::store::AttendanceStore;
    use crate::views::testing::FakeApi;
    use crate::views::{AttendanceApi, LocalApi};
    use serde_json::json;
    use std::sync::Arc;

    fn record(v: serde_json::Value) -> AttendanceRecord {
        serde_json::from_value(v).expect("record json")
    }

    fn cr() -> Session {
        Session::from(Principal::Cr)
    }

    #[test]
    fn deleting_only_subject_drops_the_date() {
        let seed = record(json!({
            "2024-01-01": {"Physics": ["101"]},
            "2024-01-02": {"Physics": ["102"], "English": []}
        }));
        let api = FakeApi::with(seed.clone());
        let mut dialog = ManageDialog::open(&api, &cr(), &seed).expect("open");
        dialog.delete_subject("2024-01-01", "Physics").expect("delete");
        dialog.delete_subject("2024-01-02", "English").expect("delete");
        assert_eq!(
            *api.doc.borrow(),
            record(json!({"2024-01-02": {"Physics": ["102"]}}))
        );
        assert_eq!(api.saves.get(), 2);
    }

    #[test]
    fn toggles_are_buffered_until_save() {
        let seed = record(json!({"2024-01-01": {"Physics": ["101"]}}));
        let api = FakeApi::with(seed.clone());
        let mut dialog = ManageDialog::open(&api, &cr(), &seed).expect("open");
        dialog.toggle("2024-01-01", "Physics", "101", false);
        dialog.toggle("2024-01-01", "Physics", "105", true);
        assert_eq!(*api.doc.borrow(), seed);

        dialog.save().expect("save");
        let expected = record(json!({"2024-01-01": {"Physics": ["105"]}}));
        assert_eq!(*api.doc.borrow(), expected);
        assert_eq!(dialog.into_records(), expected);
    }

    #[test]
    fn failed_delete_keeps_buffer() {
        let seed = record(json!({"2024-01-01": {"Physics": ["101"]}}));
        let api = FakeApi::with(seed.clone());
        let mut dialog = ManageDialog::open(&api, &cr(), &seed).expect("open");
        api.fail.set(true);
        assert!(dialog.delete_subject("2024-01-01", "Physics").is_err());
        assert_eq!(dialog.buffer(), &seed);
        assert_eq!(dialog.into_records(), seed);
    }

    #[test]
    fn clear_all_works_only_under_replace() {
        let roster = Arc::new(Roster::builtin());
        let seed = record(json!({"2024-01-01": {"Mathematics": ["101", "102"]}}));

        let store = AttendanceStore::in_memory(roster.clone());
        let api = LocalApi::new(store, WriteMode::Replace);
        api.save(&seed).expect("seed");
        let mut dialog = ManageDialog::open(&api, &cr(), &seed).expect("open");
        dialog.clear_all().expect("clear");
        assert!(api.fetch().expect("fetch").is_empty());

        let store = AttendanceStore::in_memory(roster);
        let api = LocalApi::new(store, WriteMode::Merge);
        api.save(&seed).expect("seed");
        let mut dialog = ManageDialog::open(&api, &cr(), &seed).expect("open");
        dialog.clear_all().expect("merge write accepted");
        assert_eq!(api.fetch().expect("fetch"), seed);
    }
}
