//! Class attendance service.
//!
//! A class representative marks per-subject attendance for a fixed roster; students
//! read their own numbers. The whole attendance history is one document,
//! `date -> subject -> [roll numbers present]`, stored under `attendance/records`
//! and only ever read or written whole.
//!
//! # HTTP
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/attendance` | the whole document, `{}` when nothing was recorded |
//! | POST | `/attendance` | writes the whole document with the configured mode |
//! | POST | `/login` | checks CR or student credentials, returns the session |
//! | GET | `/roster` | students (no passwords) and subjects |
//! | GET | `/health` | version and backend readiness |
//!
//! Every failure of the attendance endpoints is a 500 with
//! `{"error", "details", "code"}`, oversized bodies included. `code` is
//! `not_configured` when the service account credentials are missing or rejected,
//! and `store_failed` when the database itself cannot be reached.
//!
//! # Writes
//!
//! `replace` (the default) overwrites the stored document and is the only mode in
//! which deleting a record or clearing everything takes effect. `merge` overlays the
//! posted dates onto the stored ones and can never remove anything. There is no
//! locking: two dashboards saving at once means the later write wins.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod auth;
pub mod backup;
pub mod config;
pub mod error;
pub mod record;
pub mod roster;
pub mod routes;
pub mod session;
pub mod state;
pub mod stats;
pub mod store;
pub mod views;

use routes::{get_attendance, health_handler, login_handler, post_attendance, roster_handler};
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);

    Router::new()
        .route("/attendance", get(get_attendance).post(post_attendance))
        .route("/login", post(login_handler))
        .route("/roster", get(roster_handler))
        .route("/health", get(health_handler))
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let address = format!("{}:{}", state.config.bind, state.config.port);
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
