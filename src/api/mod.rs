//! Datasource HTTP API
//!
//! HTTP surface a dashboard host talks to, built with Axum.
//!
//! # Endpoints
//!
//! ## Query
//! - `POST /api/v1/query` - Run a batch of queries
//!
//! ## Resources
//! - `GET /api/v1/resources/:name` - `databases`, `tables`, `measures`, `dimensions`
//! - `POST /api/v1/resources/:name` - The same with a JSON body, plus `cancel`
//!
//! ## Streams
//! - `GET /api/v1/stream/:path` - WebSocket feed of continuation pages
//! - `POST /api/v1/stream/:path` - Publish (always 403)
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Connection check
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use timestream_datasource::api::{serve, AppState};
//! use timestream_datasource::config::ApiConfig;
//! use timestream_datasource::datasource::Datasource;
//! use timestream_datasource::models::DatasourceSettings;
//! use timestream_datasource::runner::FixtureRunner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = Arc::new(FixtureRunner::from_files(&["testdata/table.json"])?);
//!     let datasource = Datasource::new("local", DatasourceSettings::default(), runner);
//!     let config = ApiConfig::default();
//!
//!     serve(AppState::new(Arc::new(datasource), config.clone()), &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ApiConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/query", post(routes::query::query_data))
        .route(
            "/resources/:name",
            get(routes::resources::call_resource).post(routes::resources::call_resource),
        )
        .route(
            "/stream/:path",
            get(routes::stream::subscribe).post(routes::stream::publish),
        );

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::check_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let uid = state.datasource.uid().to_string();
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(uid = %uid, "Datasource API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Datasource API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
