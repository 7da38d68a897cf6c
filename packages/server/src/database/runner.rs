//! Stage runner
//!
//! Drives the upgrade one stage per request cycle: read the current
//! stage, execute it, record the outcome, advance. When the plan has
//! drained, bump the stored version and finish. Exactly one runner is
//! expected to be active at a time; the admin UI serializes step
//! requests.

use anyhow::Result;

use super::reporter::{DatabaseStatus, OutcomeKind, StatusReport};
use super::status::UpgradeStatus;
use super::upgrades::StageExecutor;
use super::{Database, DB_VERSION};
use crate::kernel::{get_db_version, set_db_version, SettingsStore};

/// Begin a run, choosing install vs upgrade from the stored version,
/// and seed the plan from the upgrade registry.
pub async fn start_run(settings: &dyn SettingsStore) -> Result<StatusReport> {
    let database = Database::new();
    let version = get_db_version(settings).await?;
    let mut status = UpgradeStatus::new(settings);

    let plan = database.get_upgrades_for_version(&version);
    if version.is_empty() {
        tracing::info!(stages = plan.len(), "starting database install");
        status.start_install(plan).await?;
    } else {
        tracing::info!(from = %version, to = DB_VERSION, stages = plan.len(), "starting database upgrade");
        status.start_upgrade(plan).await?;
    }

    status.get_json(None).await
}

/// Execute one stage of the in-flight run.
///
/// A failing stage is recorded via `set_error` and the run stays at
/// that stage so the operator can retry or abort; the returned payload
/// carries `result`/`reason`/`debug` instead of an error bubbling up.
/// A no-op when nothing is running.
pub async fn run_next_stage(
    settings: &dyn SettingsStore,
    executor: &dyn StageExecutor,
) -> Result<StatusReport> {
    let mut status = UpgradeStatus::new(settings);

    let Some(record) = status.load().await? else {
        return status.get_json(None).await;
    };

    match record.stage {
        None => {
            // Drained: all stage work is done, only the version bump remains
            set_db_version(settings, DB_VERSION).await?;
            status.finish().await?;
            tracing::info!(version = DB_VERSION, "database upgrade finished");
        }
        Some(stage) => match executor.execute(&stage).await {
            Ok(reason) => {
                tracing::info!(%stage, "upgrade stage complete");
                status.set_ok(&reason);
                status.set_next_stage().await?;
            }
            Err(error) => {
                tracing::error!(%stage, %error, "upgrade stage failed");
                status.set_error(&error.to_string());
            }
        },
    }

    status.get_json(None).await
}

/// Run stages until the run finishes or a stage fails.
///
/// CLI convenience; the admin UI issues one `run_next_stage` per
/// request instead.
pub async fn run_to_completion(
    settings: &dyn SettingsStore,
    executor: &dyn StageExecutor,
) -> Result<StatusReport> {
    loop {
        let status = UpgradeStatus::new(settings);
        if status.load().await?.is_none() {
            return status.get_json(None).await;
        }

        let report = run_next_stage(settings, executor).await?;

        let finished = matches!(
            report.status,
            DatabaseStatus::FinishUpdate | DatabaseStatus::FinishInstall
        );
        if finished || report.result == Some(OutcomeKind::Error) {
            return Ok(report);
        }
    }
}
