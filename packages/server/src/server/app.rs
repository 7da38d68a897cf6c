//! Application setup and server configuration.

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::kernel::PostgresSettings;
use crate::server::routes::{
    database_start_handler, database_status_handler, database_step_handler,
    database_stop_handler, health_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: PostgresSettings,
}

/// Build the Axum application router
pub fn build_app(pool: PgPool) -> Router {
    let state = AppState {
        settings: PostgresSettings::new(pool.clone()),
        db_pool: pool,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/database", get(database_status_handler))
        .route("/api/database/start", post(database_start_handler))
        .route("/api/database/step", post(database_step_handler))
        .route("/api/database/stop", post(database_stop_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
