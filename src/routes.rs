use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::spawn_blocking;
use tracing::info;

use crate::auth::Identity;
use crate::error::AppError;
use crate::record::AttendanceRecord;
use crate::session::Session;
use crate::state::AppState;

pub async fn get_attendance(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AttendanceRecord>, AppError> {
    let store = state.backend.store()?.clone();

    let doc = spawn_blocking(move || store.get())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::Fetch)?;

    Ok(Json(doc))
}

pub async fn post_attendance(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, AppError> {
    let store = state.backend.store()?.clone();
    let body = body.map_err(|e| AppError::MalformedPayload(e.body_text()))?;
    let doc = AttendanceRecord::from_json_slice(&body)
        .map_err(|e| AppError::MalformedPayload(e.to_string()))?;
    let mode = state.config.write_mode;

    spawn_blocking(move || store.put(&doc, mode))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::Save)?;

    Ok(Json(json!({
        "success": true,
        "message": "Attendance saved successfully."
    })))
}

#[derive(Deserialize)]
#[serde(tag = "role")]
enum LoginRequest {
    #[serde(rename = "CR")]
    Cr { username: String, password: String },
    #[serde(rename = "student")]
    Student {
        #[serde(rename = "rollNo")]
        roll_no: String,
        password: String,
    },
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Session>, AppError> {
    let request: LoginRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::MalformedPayload(e.to_string()))?;
    let (identity, secret) = match request {
        LoginRequest::Cr { username, password } => (Identity::Cr { username }, password),
        LoginRequest::Student { roll_no, password } => (Identity::Student { roll_no }, password),
    };

    let principal = state.authenticator.verify(&identity, &secret)?;
    let session = Session::from(principal);
    info!(role = ?session.role, roll_no = ?session.roll_no, "login");

    Ok(Json(session))
}

pub async fn roster_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "students": state.roster.public_students(),
        "subjects": state.roster.subjects(),
    }))
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.backend.status(),
    }))
}
