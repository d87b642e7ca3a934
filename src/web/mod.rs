//! HTTP API of the adapter.
//!
//! ## Endpoints
//!
//! All job routes live under `/api/{api_version}/dbaas/adapter/{app_name}`,
//! where `api_version` is `v1` or `v2`:
//!
//! - `POST   /backups` - start a backup
//! - `GET    /backups/backup/{backup_id}?blobPath=` - backup status
//! - `DELETE /backups/backup/{backup_id}?blobPath=` - evict a backup
//! - `POST   /backups/backup/{backup_id}/restore?dryRun=` - start a restore
//! - `GET    /backups/restore/{restore_id}?blobPath=` - restore status
//! - `DELETE /backups/restore/{restore_id}?blobPath=` - evict a restore
//! - `GET    /health` - liveness

mod handlers;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::context::AppContext;

pub use handlers::{BadRequestResponse, RequestId, ServerErrorResponse};

pub const API_ROOT: &str = "/api/{api_version}/dbaas/adapter/{app_name}";

/// Versions served under [`API_ROOT`]. Both expose the same operations.
pub const API_VERSIONS: [&str; 2] = ["v1", "v2"];

fn api(path: &str) -> String {
    format!("{API_ROOT}{path}")
}

/// Web server exposing the orchestrator over HTTP.
pub struct WebServer {
    ctx: AppContext,
}

impl WebServer {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route(&api("/backups"), post(handlers::collect_backup))
            .route(
                &api("/backups/backup/{backup_id}"),
                get(handlers::track_backup).delete(handlers::delete_backup),
            )
            .route(
                &api("/backups/backup/{backup_id}/restore"),
                post(handlers::restore_backup),
            )
            .route(
                &api("/backups/restore/{restore_id}"),
                get(handlers::track_restore).delete(handlers::delete_restore),
            )
            .layer(middleware::from_fn(handlers::request_id))
            .with_state(self.ctx.clone())
    }

    /// Bind the configured address and serve until [`WebServer::shutdown`].
    pub async fn start(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.ctx.config.bind).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "Backup adapter API listening");

        let shutdown = self.ctx.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        Ok(())
    }

    /// Stop accepting connections and abort outstanding daemon calls.
    pub fn shutdown(&self) {
        self.ctx.shutdown.cancel();
    }
}
