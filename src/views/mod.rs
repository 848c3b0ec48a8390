//! Dashboard workflows as the CR and students drive them.
//!
//! Views never patch the stored document. They fetch it whole, change a local copy
//! and post the whole copy back through an [`AttendanceApi`]; a failed post leaves
//! the local copy as it was before the attempt.

pub mod cr;
pub mod manage;
pub mod student;

pub use cr::MarkingSession;
pub use manage::ManageDialog;
pub use student::StudentDashboard;

use serde::Serialize;
use thiserror::Error;

use crate::record::{AttendanceRecord, WriteMode};
use crate::session::SessionError;
use crate::store::{AttendanceStore, StoreError};

/// The two calls a dashboard makes: `GET /attendance` and `POST /attendance`.
pub trait AttendanceApi {
    fn fetch(&self) -> Result<AttendanceRecord, StoreError>;
    fn save(&self, doc: &AttendanceRecord) -> Result<(), StoreError>;
}

/// In-process API over a store handle, writing with the server's configured mode.
pub struct LocalApi {
    store: AttendanceStore,
    mode: WriteMode,
}

impl LocalApi {
    pub fn new(store: AttendanceStore, mode: WriteMode) -> Self {
        Self { store, mode }
    }
}

impl AttendanceApi for LocalApi {
    fn fetch(&self) -> Result<AttendanceRecord, StoreError> {
        self.store.get()
    }

    fn save(&self, doc: &AttendanceRecord) -> Result<(), StoreError> {
        self.store.put(doc, self.mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient message shown after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: "Error".to_string(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("unknown subject: {0}")]
    UnknownSubject(String),
    #[error("unknown roll number: {0}")]
    UnknownStudent(String),
    #[error("{}: {source}", .notice.description)]
    Api {
        notice: Notice,
        #[source]
        source: StoreError,
    },
}

impl ViewError {
    fn api(description: &str, source: StoreError) -> Self {
        ViewError::Api {
            notice: Notice::error(description),
            source,
        }
    }

    pub fn notice(&self) -> Notice {
        match self {
            ViewError::Api { notice, .. } => notice.clone(),
            other => Notice::error(other.to_string()),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};

    use super::*;

    /// Stands in for the network: holds one document, can be told to fail.
    #[derive(Default)]
    pub struct FakeApi {
        pub doc: RefCell<AttendanceRecord>,
        pub fail: Cell<bool>,
        pub saves: Cell<usize>,
    }

    impl FakeApi {
        pub fn with(doc: AttendanceRecord) -> Self {
            Self {
                doc: RefCell::new(doc),
                ..Default::default()
            }
        }
    }

    impl AttendanceApi for FakeApi {
        fn fetch(&self) -> Result<AttendanceRecord, StoreError> {
            if self.fail.get() {
                return Err(StoreError::Unavailable("offline".to_string()));
            }
            Ok(self.doc.borrow().clone())
        }

        fn save(&self, doc: &AttendanceRecord) -> Result<(), StoreError> {
            if self.fail.get() {
                return Err(StoreError::Unavailable("offline".to_string()));
            }
            self.saves.set(self.saves.get() + 1);
            *self.doc.borrow_mut() = doc.clone();
            Ok(())
        }
    }
}
