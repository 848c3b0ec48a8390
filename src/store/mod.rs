//! Attendance document storage.
//!
//! A backend holds exactly one document (`attendance/records`) and only knows how
//! to read it whole and write it whole. [`AttendanceStore`] is the handle the rest
//! of the service talks to: it runs the roster check before every write and then
//! hands the document to the backend.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{open_db, SqliteStore};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::record::{AttendanceRecord, Violation, WriteMode};
use crate::roster::Roster;

pub const ATTENDANCE_COLLECTION: &str = "attendance";
pub const ATTENDANCE_DOC_ID: &str = "records";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("stored document is corrupt: {0}")]
    Corrupt(String),
    #[error("document rejected: {}", join_violations(.0))]
    Rejected(Vec<Violation>),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// A single-document backend. `get` on a backend that never saw a write returns the
/// empty document, not an error.
pub trait DocumentStore: Send + Sync {
    fn get(&self) -> Result<AttendanceRecord, StoreError>;
    fn put(&self, doc: &AttendanceRecord, mode: WriteMode) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPolicy {
    Strict,
    Warn,
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationPolicy::Strict => f.write_str("strict"),
            ValidationPolicy::Warn => f.write_str("warn"),
        }
    }
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationPolicy::Strict),
            "warn" => Ok(ValidationPolicy::Warn),
            other => Err(format!("unknown validation policy: {other}")),
        }
    }
}

#[derive(Clone)]
pub struct AttendanceStore {
    backend: Arc<dyn DocumentStore>,
    roster: Arc<Roster>,
    policy: ValidationPolicy,
}

impl AttendanceStore {
    pub fn new(
        backend: Arc<dyn DocumentStore>,
        roster: Arc<Roster>,
        policy: ValidationPolicy,
    ) -> Self {
        Self {
            backend,
            roster,
            policy,
        }
    }

    pub fn in_memory(roster: Arc<Roster>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), roster, ValidationPolicy::Strict)
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn get(&self) -> Result<AttendanceRecord, StoreError> {
        self.backend.get()
    }

    pub fn put(&self, doc: &AttendanceRecord, mode: WriteMode) -> Result<(), StoreError> {
        let (blocking, advisory): (Vec<_>, Vec<_>) = doc
            .validate(&self.roster)
            .into_iter()
            .partition(Violation::is_blocking);
        if !blocking.is_empty() && self.policy == ValidationPolicy::Strict {
            return Err(StoreError::Rejected(blocking));
        }
        for v in blocking.iter().chain(&advisory) {
            warn!(violation = %v, "writing attendance with violation");
        }
        self.backend.put(doc, mode)?;
        info!(%mode, dates = doc.date_count(), "attendance document written");
        Ok(())
    }
}
