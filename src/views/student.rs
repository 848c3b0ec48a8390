use super::{AttendanceApi, ViewError};
use crate::record::AttendanceRecord;
use crate::roster::Roster;
use crate::session::{Role, Session};
use crate::stats::{aggregate, StatsFilter, StudentReport};

pub struct StudentDashboard<'a> {
    roster: &'a Roster,
    roll_no: String,
    name: String,
    doc: AttendanceRecord,
}

impl<'a> StudentDashboard<'a> {
    pub fn open<A: AttendanceApi>(
        api: &A,
        roster: &'a Roster,
        session: &Session,
    ) -> Result<Self, ViewError> {
        let session = session.require(Role::Student)?;
        let roll_no = session.roll_no.clone().unwrap_or_default();
        let name = session
            .name
            .clone()
            .or_else(|| roster.student(&roll_no).map(|s| s.name.clone()))
            .unwrap_or_default();
        let doc = api.fetch().map_err(|e| {
            ViewError::api(
                "Could not load attendance data. Please check your connection or backend setup.",
                e,
            )
        })?;
        Ok(Self {
            roster,
            roll_no,
            name,
            doc,
        })
    }

    pub fn roll_no(&self) -> &str {
        &self.roll_no
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn report(&self, filter: &StatsFilter) -> StudentReport {
        aggregate(&self.doc, self.roster, &self.roll_no, filter)
    }

    pub fn motivation(&self, filter: &StatsFilter) -> &'static str {
        if self.report(filter).stats.is_good() {
            "Great! Keep it up!"
        } else {
            "You need to improve your attendance."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::session::SessionError;
    use crate::views::testing::FakeApi;
    use serde_json::json;

    fn record(v: serde_json::Value) -> AttendanceRecord {
        serde_json::from_value(v).expect("record json")
    }

    #[test]
    fn student_sees_own_numbers() {
        let api = FakeApi::with(record(json!({
            "2024-01-01": {"Mathematics": ["101", "102"], "Physics": ["102"]},
            "2024-01-02": {"Mathematics": ["102"]}
        })));
        let roster = Roster::builtin();
        let session = Session::from(Principal::Student {
            roll_no: "102".to_string(),
            name: "Sita".to_string(),
        });
        let dash = StudentDashboard::open(&api, &roster, &session).expect("open");
        let report = dash.report(&StatsFilter::default());
        assert_eq!((report.stats.attended, report.stats.total), (3, 3));
        assert_eq!(report.stats.rounded_percentage(), 100);
        assert_eq!(dash.motivation(&StatsFilter::default()), "Great! Keep it up!");
        assert_eq!(dash.name(), "Sita");
    }

    #[test]
    fn cr_session_cannot_open_student_view() {
        let api = FakeApi::default();
        let roster = Roster::builtin();
        let err = StudentDashboard::open(&api, &roster, &Session::from(Principal::Cr))
            .err()
            .expect("refused");
        assert!(matches!(
            err,
            ViewError::Session(SessionError::WrongRole(Role::Student))
        ));
    }
}
