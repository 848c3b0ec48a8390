use std::{env, fmt, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::anyhow;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::record::WriteMode;
use crate::store::ValidationPolicy;

pub const PROJECT_ID_VAR: &str = "FIREBASE_PROJECT_ID";
pub const CLIENT_EMAIL_VAR: &str = "FIREBASE_CLIENT_EMAIL";
pub const PRIVATE_KEY_VAR: &str = "FIREBASE_PRIVATE_KEY";

/// Problems building the store handle. These are operator problems, reported apart
/// from failures of individual reads and writes.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("service account credentials are not set: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),
    #[error("service account credentials are invalid: {0}")]
    InvalidCredentials(String),
    #[error("document database could not be opened: {0}")]
    Backend(String),
}

impl ConfigError {
    /// True when the credentials themselves are missing or rejected, as opposed to
    /// the database file being unreachable.
    pub fn is_credentials(&self) -> bool {
        !matches!(self, ConfigError::Backend(_))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub write_mode: WriteMode,
    pub validation: ValidationPolicy,
    pub roster_path: Option<PathBuf>,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(|key| env::var(key).ok())
    }

    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            bind: try_load(&lookup, "ATTENDANCE_BIND", "0.0.0.0")?,
            port: try_load(&lookup, "ATTENDANCE_PORT", "9002")?,
            data_dir: try_load(&lookup, "ATTENDANCE_DATA_DIR", "./data")?,
            write_mode: try_load(&lookup, "ATTENDANCE_WRITE_MODE", "replace")?,
            validation: try_load(&lookup, "ATTENDANCE_VALIDATION", "strict")?,
            roster_path: lookup("ATTENDANCE_ROSTER")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            max_body_bytes: try_load(&lookup, "ATTENDANCE_MAX_BODY_BYTES", "2097152")?,
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> anyhow::Result<T>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow!("invalid {key} value: {e}"))
}

/// Credentials the document database is opened with.
#[derive(Clone)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    private_key: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl ServiceAccount {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let project_id = read(PROJECT_ID_VAR);
        let client_email = read(CLIENT_EMAIL_VAR);
        let private_key = read(PRIVATE_KEY_VAR);

        let (Some(project_id), Some(client_email), Some(private_key)) =
            (project_id.clone(), client_email.clone(), private_key.clone())
        else {
            let missing = [
                (PROJECT_ID_VAR, project_id.is_none()),
                (CLIENT_EMAIL_VAR, client_email.is_none()),
                (PRIVATE_KEY_VAR, private_key.is_none()),
            ]
            .into_iter()
            .filter(|(_, absent)| *absent)
            .map(|(name, _)| name)
            .collect();
            return Err(ConfigError::MissingCredentials(missing));
        };

        Self::new(project_id, client_email, private_key)
    }

    pub fn new(
        project_id: String,
        client_email: String,
        private_key: String,
    ) -> Result<Self, ConfigError> {
        let project_id = project_id.trim().to_string();
        let client_email = client_email.trim().to_string();
        // Keys pasted into env files carry literal "\n" escapes.
        let private_key = private_key.replace("\\n", "\n");

        if !project_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::InvalidCredentials(format!(
                "project id {project_id:?} may only contain lowercase letters, digits and '-'"
            )));
        }
        if !client_email.contains('@') {
            return Err(ConfigError::InvalidCredentials(format!(
                "client email {client_email:?} is not an email address"
            )));
        }
        if !private_key.contains("-----BEGIN") || !private_key.contains("PRIVATE KEY-----") {
            return Err(ConfigError::InvalidCredentials(
                "private key is not a PEM private key".to_string(),
            ));
        }

        Ok(Self {
            project_id,
            client_email,
            private_key,
        })
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// Hex SHA-256 of the unescaped private key.
    pub fn key_fingerprint(&self) -> String {
        let digest = Sha256::digest(self.private_key.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}
