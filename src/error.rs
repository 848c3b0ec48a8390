use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Document store not configured")]
    NotConfigured(Arc<ConfigError>),

    #[error("Document store unavailable")]
    Unavailable(Arc<ConfigError>),

    #[error("Malformed payload")]
    MalformedPayload(String),

    #[error("Failed to fetch attendance data")]
    Fetch(#[source] StoreError),

    #[error("Failed to save attendance data")]
    Save(#[source] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Internal error")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotConfigured(_) => "not_configured",
            AppError::MalformedPayload(_) => "malformed_payload",
            AppError::Save(StoreError::Rejected(_)) => "validation_failed",
            AppError::Unavailable(_) | AppError::Fetch(_) | AppError::Save(_) => "store_failed",
            AppError::Auth(_) => "invalid_credentials",
            AppError::Internal(_) => "internal",
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            AppError::NotConfigured(e) | AppError::Unavailable(e) => Some(e.to_string()),
            AppError::MalformedPayload(detail) | AppError::Internal(detail) => {
                Some(detail.clone())
            }
            AppError::Fetch(e) | AppError::Save(e) => Some(e.to_string()),
            AppError::Auth(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        if let Some(details) = self.details() {
            if status.is_server_error() {
                error!(code = self.code(), "{self}: {details}");
            }
            body["details"] = json!(details);
        } else {
            warn!(code = self.code(), "{self}");
        }

        (status, Json(body)).into_response()
    }
}
