//! HTTP API served to peers.
//!
//! The web layer is the routing shell around the core: it extracts the
//! caller's address and credentials, hands them to the access policy,
//! and maps the file operations onto HTTP.
//!
//! ## API Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | / | Service status |
//! | GET | /api/files/list | List a directory |
//! | GET | /api/files/download | Download a file (range-aware) |
//! | GET | /api/files/zip | Download a selection as a zip |
//! | GET | /api/devices | Peers seen recently |

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::access::AccessPolicy;
use crate::error::Result;
use crate::registry::PeerRegistry;
use crate::share::ShareRoot;

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Bind to localhost only
    pub localhost_only: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_SHARE_PORT,
            localhost_only: false,
        }
    }
}

impl ServerConfig {
    /// Get the bind address for the server.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        if self.localhost_only {
            SocketAddr::from(([127, 0, 0, 1], self.port))
        } else {
            SocketAddr::from(([0, 0, 0, 0], self.port))
        }
    }
}

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The exposed directory tree
    pub share: Arc<ShareRoot>,
    /// Access policy snapshot
    pub policy: Arc<AccessPolicy>,
    /// Table of discovered peers
    pub registry: Arc<PeerRegistry>,
    /// Where archive artifacts are staged
    pub staging_dir: PathBuf,
    /// How long peers stay visible after their last beacon
    pub liveness_window: Duration,
}

impl AppState {
    /// Assemble handler state.
    #[must_use]
    pub fn new(share: ShareRoot, policy: AccessPolicy, registry: Arc<PeerRegistry>) -> Self {
        Self {
            share: Arc::new(share),
            policy: Arc::new(policy),
            registry,
            staging_dir: std::env::temp_dir(),
            liveness_window: crate::LIVENESS_WINDOW,
        }
    }

    /// Override the archive staging directory.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: PathBuf) -> Self {
        self.staging_dir = dir;
        self
    }
}

/// Build the API router.
///
/// Peers call this API from browsers and native clients across the LAN,
/// so CORS is wide open.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::get_status))
        .route("/api/files/list", get(handlers::list_files))
        .route("/api/files/download", get(handlers::download_file))
        .route("/api/files/zip", get(handlers::download_zip))
        .route("/api/devices", get(handlers::list_devices))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the server until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails.
pub async fn serve(
    config: &ServerConfig,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("file API listening on http://{}", addr);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    Ok(())
}
