use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use super::{DocumentStore, StoreError, ATTENDANCE_COLLECTION, ATTENDANCE_DOC_ID};
use crate::config::{ConfigError, ServiceAccount};
use crate::record::{AttendanceRecord, WriteMode};

/// Opens (creating if needed) the project database under `data_dir`.
pub fn open_db(data_dir: &Path, project_id: &str) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join(format!("{project_id}.sqlite3"));
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents(
            collection TEXT NOT NULL,
            doc_id TEXT NOT NULL,
            body TEXT NOT NULL,
            revision TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            updated_by TEXT NOT NULL,
            PRIMARY KEY(collection, doc_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS project_binding(
            project_id TEXT PRIMARY KEY,
            client_email TEXT NOT NULL,
            key_fingerprint TEXT NOT NULL,
            bound_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

/// Document backend over one SQLite file per project. The file is bound to the
/// service account that created it.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    writer: String,
}

impl SqliteStore {
    pub fn open(data_dir: &Path, account: &ServiceAccount) -> Result<Self, ConfigError> {
        let conn = open_db(data_dir, &account.project_id)
            .map_err(|e| ConfigError::Backend(format!("{e:#}")))?;
        check_binding(&conn, account)?;
        info!(
            project = %account.project_id,
            data_dir = %data_dir.to_string_lossy(),
            "document database opened"
        );
        Ok(Self {
            conn: Mutex::new(conn),
            writer: account.client_email.clone(),
        })
    }

    /// Revision stamped by the most recent write, if any.
    pub fn revision(&self) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let rev = conn
            .query_row(
                "SELECT revision FROM documents WHERE collection = ? AND doc_id = ?",
                (ATTENDANCE_COLLECTION, ATTENDANCE_DOC_ID),
                |r| r.get(0),
            )
            .optional()?;
        Ok(rev)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database handle poisoned".to_string()))
    }
}

fn check_binding(conn: &Connection, account: &ServiceAccount) -> Result<(), ConfigError> {
    let backend = |e: rusqlite::Error| ConfigError::Backend(e.to_string());
    let fingerprint = account.key_fingerprint();
    let bound: Option<(String, String)> = conn
        .query_row(
            "SELECT client_email, key_fingerprint FROM project_binding WHERE project_id = ?",
            [&account.project_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(backend)?;

    match bound {
        Some((email, fp)) if email == account.client_email && fp == fingerprint => Ok(()),
        Some((email, _)) => Err(ConfigError::InvalidCredentials(format!(
            "project {} is bound to {email}, credentials for {} do not match",
            account.project_id, account.client_email
        ))),
        None => {
            conn.execute(
                "INSERT INTO project_binding(project_id, client_email, key_fingerprint, bound_at)
                 VALUES(?, ?, ?, ?)",
                (
                    &account.project_id,
                    &account.client_email,
                    &fingerprint,
                    Utc::now().to_rfc3339(),
                ),
            )
            .map_err(backend)?;
            info!(project = %account.project_id, "bound project database to service account");
            Ok(())
        }
    }
}

fn read_body(conn: &Connection) -> Result<Option<AttendanceRecord>, StoreError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ? AND doc_id = ?",
            (ATTENDANCE_COLLECTION, ATTENDANCE_DOC_ID),
            |r| r.get(0),
        )
        .optional()?;
    body.map(|text| {
        serde_json::from_str(&text).map_err(|e| StoreError::Corrupt(e.to_string()))
    })
    .transpose()
}

impl DocumentStore for SqliteStore {
    fn get(&self) -> Result<AttendanceRecord, StoreError> {
        let conn = self.lock()?;
        Ok(read_body(&conn)?.unwrap_or_default())
    }

    fn put(&self, doc: &AttendanceRecord, mode: WriteMode) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let next = match mode {
            WriteMode::Replace => doc.clone(),
            WriteMode::Merge => {
                let mut current = read_body(&tx)?.unwrap_or_default();
                current.merge_from(doc.clone());
                current
            }
        };
        let body =
            serde_json::to_string(&next).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let revision = Uuid::new_v4().to_string();

        tx.execute(
            "INSERT INTO documents(collection, doc_id, body, revision, updated_at, updated_by)
             VALUES(?, ?, ?, ?, ?, ?)
             ON CONFLICT(collection, doc_id) DO UPDATE SET
               body = excluded.body,
               revision = excluded.revision,
               updated_at = excluded.updated_at,
               updated_by = excluded.updated_by",
            (
                ATTENDANCE_COLLECTION,
                ATTENDANCE_DOC_ID,
                &body,
                &revision,
                Utc::now().to_rfc3339(),
                &self.writer,
            ),
        )?;
        tx.commit()?;
        debug!(%revision, %mode, "document committed");
        Ok(())
    }
}
