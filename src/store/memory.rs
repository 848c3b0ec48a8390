use std::sync::Mutex;

use super::{DocumentStore, StoreError};
use crate::record::{AttendanceRecord, WriteMode};

/// Process-local backend. Starts with no document.
#[derive(Default)]
pub struct MemoryStore {
    doc: Mutex<Option<AttendanceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self) -> Result<AttendanceRecord, StoreError> {
        let guard = self
            .doc
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn put(&self, doc: &AttendanceRecord, mode: WriteMode) -> Result<(), StoreError> {
        let mut guard = self
            .doc
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        match mode {
            WriteMode::Replace => *guard = Some(doc.clone()),
            WriteMode::Merge => guard
                .get_or_insert_with(AttendanceRecord::new)
                .merge_from(doc.clone()),
        }
        Ok(())
    }
}
