//! HTTP surface: response envelopes and the top-level router

pub mod response;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::db;
use crate::features::{self, FeatureState};
use crate::middleware;

pub use response::{ApiResponse, ErrorResponse};

/// Create the application router with all routes and middleware
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let health = Router::new()
        .route("/health", get(health_check))
        .with_state(state.db.clone());

    Router::new()
        .route("/", get(root))
        .merge(health)
        .nest("/api/v1", features::router(state))
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Serve `app` until `signal` resolves, then drain in-flight requests.
///
/// Returns `false` when requests were still running after `drain_timeout`;
/// they are dropped with the server. A deletion cut short this way is safe
/// to re-run.
pub async fn serve_with_drain(
    listener: TcpListener,
    app: Router,
    signal: impl Future<Output = ()> + Send + 'static,
    drain_timeout: Duration,
) -> anyhow::Result<bool> {
    let triggered = Arc::new(Notify::new());
    let server = axum::serve(listener, app).with_graceful_shutdown({
        let triggered = Arc::clone(&triggered);
        async move {
            signal.await;
            triggered.notify_one();
        }
    });

    tokio::select! {
        result = server => {
            result?;
            Ok(true)
        },
        _ = async {
            triggered.notified().await;
            tokio::time::sleep(drain_timeout).await;
        } => {
            tracing::warn!(
                drain_timeout_secs = drain_timeout.as_secs(),
                "In-flight requests did not finish before the shutdown timeout"
            );
            Ok(false)
        },
    }
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Labelhub Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Health check handler
async fn health_check(State(db): State<PgPool>) -> Result<Response, StatusCode> {
    match db::health_check(&db).await {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}
