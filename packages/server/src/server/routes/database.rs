//! Admin API for the database upgrade engine.
//!
//! The admin UI polls the status endpoint and drives the upgrade one
//! step per request. Stage failures come back as a well-formed status
//! payload (`result`/`reason`/`debug`), not an HTTP error: the UI never
//! needs to distinguish transport failure from logical stage failure.

use axum::{extract::Extension, http::StatusCode, Json};
use serde_json::json;

use crate::database::{runner, DatabaseStatus, SqlStageExecutor, StatusReport, UpgradeStatus};
use crate::server::app::AppState;

fn internal_error(error: anyhow::Error) -> (StatusCode, String) {
    tracing::error!(%error, "database admin request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

/// Descriptor of this plugin's admin API, handed to fresh installs so
/// the UI can verify connectivity before running the install.
fn api_descriptor() -> serde_json::Value {
    json!({
        "routes": {
            "status": "/api/database",
            "start": "/api/database/start",
            "step": "/api/database/step",
            "stop": "/api/database/stop",
        },
    })
}

fn with_api(mut report: StatusReport) -> StatusReport {
    if report.status == DatabaseStatus::NeedInstall {
        report.api = Some(api_descriptor());
    }
    report
}

/// Current upgrade status projection. Read-only; safe to poll from any
/// number of sessions.
pub async fn database_status_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<StatusReport>, (StatusCode, String)> {
    let status = UpgradeStatus::new(&state.settings);
    let report = status.get_json(None).await.map_err(internal_error)?;

    Ok(Json(with_api(report)))
}

/// Begin an install or upgrade run, chosen from the stored version.
pub async fn database_start_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<StatusReport>, (StatusCode, String)> {
    let report = runner::start_run(&state.settings)
        .await
        .map_err(internal_error)?;

    Ok(Json(with_api(report)))
}

/// Execute one stage of the in-flight run.
pub async fn database_step_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<StatusReport>, (StatusCode, String)> {
    let executor = SqlStageExecutor::new(state.db_pool.clone());
    let report = runner::run_next_stage(&state.settings, &executor)
        .await
        .map_err(internal_error)?;

    Ok(Json(with_api(report)))
}

/// Abort the run. Cooperative: resets the record but cannot interrupt
/// a stage body that is already executing.
pub async fn database_stop_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<StatusReport>, (StatusCode, String)> {
    let mut status = UpgradeStatus::new(&state.settings);
    status.stop_update().await.map_err(internal_error)?;
    let report = status.get_json(None).await.map_err(internal_error)?;

    Ok(Json(with_api(report)))
}
