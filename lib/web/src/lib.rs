//! HTTP surface of the SPARQL proxy.
//!
//! Clients submit queries on `/sparql` and poll their jobs on `/jobs/{token}`. When admin
//! credentials are configured, the queue can be observed and controlled below `/admin`.

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

mod admin;
mod config;
mod error;
mod jobs;
mod query_log;
mod sparql;
mod state;

use crate::admin::create_admin_routes;
use crate::jobs::create_jobs_routes;
use crate::sparql::create_sparql_routes;
pub use config::{AdminCredentials, ServerConfig, MAX_SPARQL_BODY_SIZE};
pub use error::ProxyServerError;
pub use query_log::QueryLog;
pub use sparql::X_CACHE;
pub use state::AppState;

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let app_state = AppState {
        proxy: config.proxy,
        admin: config.admin,
        query_log: config.query_log.map(QueryLog::new),
        trust_proxy: config.trust_proxy,
    };

    let app = create_router(app_state);
    let app = if config.cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Could not bind to {}", config.bind))?;
    info!(address = %listener.local_addr()?, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server failed")
}

pub fn create_router(app_state: AppState) -> Router {
    let mut router = Router::new()
        .route(
            "/",
            get(|| async { (StatusCode::FOUND, [(LOCATION, "/sparql")]) }),
        )
        .merge(create_sparql_routes())
        .merge(create_jobs_routes());
    if app_state.admin.is_some() {
        router = router.nest("/admin", create_admin_routes(app_state.clone()));
    }

    router
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::disable())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "Could not listen for the shutdown signal");
        futures::future::pending::<()>().await;
    }
    info!("Shutting down");
}
