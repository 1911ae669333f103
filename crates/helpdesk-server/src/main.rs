//! # helpdesk-server
//!
//! HTTP backend for the customer-support helpdesk.
//!
//! This binary provides:
//! - **REST API** (axum) for ticket intake, claiming, resolution, and the
//!   staff/requester conversations attached to tickets
//! - **Round-robin auto-assignment** of new tickets to staff in the ticket's
//!   category, bounded by a per-staff workload cap
//! - **Priority escalation** sweeps that raise the priority of stale tickets
//! - **Admin directory** endpoints for users, staff, and categories

mod api;
mod config;
mod desk;
mod error;
mod identity;
mod notify;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use helpdesk_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::desk::escalation::spawn_escalation;
use crate::desk::Desk;
use crate::notify::LogNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,helpdesk_server=debug")),
        )
        .init();

    info!("Starting helpdesk server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the database and build the desk
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database ready");
    }

    let desk = Arc::new(Mutex::new(Desk::new(
        db,
        config.desk_policy(),
        Arc::new(LogNotifier),
    )));

    let app_state = AppState {
        desk: desk.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------
    let _escalation = spawn_escalation(desk, config.escalation_interval, config.escalation_budget);

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
