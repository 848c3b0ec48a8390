use std::sync::Arc;

use tracing::{error, info};

use crate::auth::{Authenticator, RosterAuthenticator};
use crate::config::{Config, ConfigError, ServiceAccount};
use crate::error::AppError;
use crate::roster::Roster;
use crate::store::{AttendanceStore, SqliteStore};

/// Result of building the store at startup. An unconfigured backend is kept as a
/// value so every request can report why it cannot be served.
#[derive(Clone)]
pub enum Backend {
    Ready(AttendanceStore),
    Unconfigured(Arc<ConfigError>),
}

impl Backend {
    pub fn connect(config: &Config, roster: Arc<Roster>) -> Self {
        let opened = ServiceAccount::from_env()
            .and_then(|account| SqliteStore::open(&config.data_dir, &account));
        match opened {
            Ok(store) => {
                info!(validation = %config.validation, "document store ready");
                Backend::Ready(AttendanceStore::new(
                    Arc::new(store),
                    roster,
                    config.validation,
                ))
            }
            Err(e) => {
                error!(credentials = e.is_credentials(), "document store not available: {e}");
                Backend::Unconfigured(Arc::new(e))
            }
        }
    }

    pub fn store(&self) -> Result<&AttendanceStore, AppError> {
        match self {
            Backend::Ready(store) => Ok(store),
            Backend::Unconfigured(e) if e.is_credentials() => {
                Err(AppError::NotConfigured(e.clone()))
            }
            Backend::Unconfigured(e) => Err(AppError::Unavailable(e.clone())),
        }
    }

    /// Readiness as reported by `/health`.
    pub fn status(&self) -> &'static str {
        match self {
            Backend::Ready(_) => "ready",
            Backend::Unconfigured(e) if e.is_credentials() => "not_configured",
            Backend::Unconfigured(_) => "unavailable",
        }
    }
}

pub struct AppState {
    pub config: Config,
    pub roster: Arc<Roster>,
    pub authenticator: Arc<dyn Authenticator>,
    pub backend: Backend,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let roster = Arc::new(match &config.roster_path {
            Some(path) => {
                info!("loading roster from {}", path.to_string_lossy());
                Roster::load(path)?
            }
            None => Roster::builtin(),
        });
        let backend = Backend::connect(&config, roster.clone());
        Ok(Self::with_backend(config, roster, backend))
    }

    pub fn with_backend(config: Config, roster: Arc<Roster>, backend: Backend) -> Arc<Self> {
        Arc::new(Self {
            config,
            authenticator: Arc::new(RosterAuthenticator::new(roster.clone())),
            roster,
            backend,
        })
    }
}
