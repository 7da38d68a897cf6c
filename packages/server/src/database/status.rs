//! Database upgrade status engine
//!
//! Owns the persisted run record: one option slot holding the fixed
//! plan, the current stage pointer, and the run mode. Every operation
//! re-reads the slot and overwrites it wholesale - the record is never
//! cached between calls, so independent request cycles (stage runner,
//! status pollers) all observe the latest write.
//!
//! Out-of-sequence calls (advancing while nothing is running, stopping
//! twice) are deliberate no-ops: pollers and runners may legitimately
//! race against state transitions and must never see an error for it.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::reporter::{project, StatusReport, StatusSnapshot};
use super::schema::LatestSchema;
use crate::kernel::{get_db_version, SettingsStore, OPT_DATABASE_STAGE};

/// Whether the run is upgrading an existing store or installing fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Upgrade,
    Install,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upgrade => "upgrade",
            Self::Install => "install",
        }
    }
}

/// Result of the most recently executed stage.
///
/// Transient: carried into the status projection by the request that
/// produced it, not persisted beyond that call. The caller chooses the
/// variant explicitly - a reason is never runtime-sniffed into an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Ok {
        reason: String,
    },
    Error {
        reason: String,
        debug: serde_json::Value,
    },
}

impl RunOutcome {
    pub fn ok(reason: impl Into<String>) -> Self {
        Self::Ok {
            reason: reason.into(),
        }
    }

    pub fn error(reason: impl Into<String>, debug: serde_json::Value) -> Self {
        Self::Error {
            reason: reason.into(),
            debug,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Ok { reason } | Self::Error { reason, .. } => reason,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn debug(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Error { debug, .. } => Some(debug),
            Self::Ok { .. } => None,
        }
    }
}

/// The persisted run record, overwritten wholesale on each mutating call.
///
/// Legacy record format: `stage` is the literal JSON `false` when no
/// stage remains, not `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    #[serde(with = "stage_field")]
    pub stage: Option<String>,
    pub stages: Vec<String>,
    pub mode: Mode,
}

mod stage_field {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        stage: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match stage {
            Some(stage) => serializer.serialize_str(stage),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        // Anything that isn't a string (false, null) means "no stage"
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(stage) => Ok(Some(stage)),
            _ => Ok(None),
        }
    }
}

/// The upgrade status engine.
///
/// One value per request cycle. The run record itself lives in the
/// settings store; only the stage outcome and the post-`finish` display
/// state are held on the value, since neither outlives the request that
/// produced it.
pub struct UpgradeStatus<'a> {
    settings: &'a dyn SettingsStore,
    outcome: Option<RunOutcome>,
    finished: Option<Mode>,
    started: Option<Mode>,
}

impl<'a> UpgradeStatus<'a> {
    pub fn new(settings: &'a dyn SettingsStore) -> Self {
        Self {
            settings,
            outcome: None,
            finished: None,
            started: None,
        }
    }

    /// Begin an upgrade run over an existing store.
    ///
    /// Overwrites any prior record unconditionally.
    pub async fn start_upgrade(&mut self, plan: Vec<String>) -> Result<()> {
        self.start(Mode::Upgrade, plan).await
    }

    /// Begin an install run over a fresh store.
    pub async fn start_install(&mut self, plan: Vec<String>) -> Result<()> {
        self.start(Mode::Install, plan).await
    }

    async fn start(&mut self, mode: Mode, plan: Vec<String>) -> Result<()> {
        let record = StageRecord {
            stage: plan.first().cloned(),
            stages: plan,
            mode,
        };

        self.outcome = None;
        self.finished = None;
        self.started = Some(mode);
        self.save(&record).await
    }

    /// Abort the run. Idempotent: stopping while nothing is running is
    /// a no-op.
    pub async fn stop_update(&mut self) -> Result<()> {
        self.outcome = None;
        self.finished = None;
        self.settings.delete(OPT_DATABASE_STAGE).await
    }

    /// Seek directly to a stage without validating plan membership.
    ///
    /// Debug/test operation only - the stage runner never calls this.
    /// No-op when nothing is running.
    pub async fn set_stage(&self, stage: Option<&str>) -> Result<()> {
        let Some(mut record) = self.load().await? else {
            return Ok(());
        };

        record.stage = stage.map(String::from);
        self.save(&record).await
    }

    /// The stage the runner should execute next, `None` when not
    /// running or when the plan has drained.
    pub async fn get_current_stage(&self) -> Result<Option<String>> {
        Ok(self.load().await?.and_then(|record| record.stage))
    }

    /// Advance past the current stage.
    ///
    /// No-op when not running. When the current stage is the last plan
    /// element (or absent from the plan), the record drains to "no
    /// stage": all stage work is done and only the version bump remains.
    pub async fn set_next_stage(&self) -> Result<()> {
        let Some(mut record) = self.load().await? else {
            return Ok(());
        };

        let Some(current) = record.stage.take() else {
            return Ok(());
        };

        record.stage = record
            .stages
            .iter()
            .position(|stage| *stage == current)
            .and_then(|index| record.stages.get(index + 1))
            .cloned();

        self.save(&record).await
    }

    /// Record a successful stage outcome without moving the pointer.
    pub fn set_ok(&mut self, reason: &str) {
        self.outcome = Some(RunOutcome::ok(reason));
    }

    /// Record a failed stage outcome without moving the pointer, along
    /// with a snapshot of the expected target schema for diagnostics.
    ///
    /// Recording the annotation itself never fails - the run stays at
    /// the failing stage so an operator can retry or abort.
    pub fn set_error(&mut self, reason: &str) {
        self.outcome = Some(RunOutcome::error(
            reason,
            LatestSchema::new().get_table_schema(),
        ));
    }

    /// Enter the terminal display state: exactly 100% complete, last
    /// reason preserved, stage record cleared. The next `start_*`
    /// replaces it.
    pub async fn finish(&mut self) -> Result<()> {
        let mode = self
            .load()
            .await?
            .map(|record| record.mode)
            .or(self.started)
            .unwrap_or(Mode::Upgrade);

        self.settings.delete(OPT_DATABASE_STAGE).await?;
        self.finished = Some(mode);

        Ok(())
    }

    /// Project the persisted record plus an optional live outcome into
    /// the wire-shaped status payload. Never mutates state.
    pub async fn get_json(&self, live: Option<&RunOutcome>) -> Result<StatusReport> {
        let record = self.load().await?;
        let stored_version = get_db_version(self.settings).await?;

        Ok(project(StatusSnapshot {
            record: record.as_ref(),
            finished: self.finished,
            attached: self.outcome.as_ref(),
            live,
            stored_version: &stored_version,
            target_version: super::DB_VERSION,
            api: None,
        }))
    }

    /// The outcome attached during this request cycle, if any.
    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub(crate) async fn load(&self) -> Result<Option<StageRecord>> {
        let Some(value) = self.settings.get(OPT_DATABASE_STAGE).await? else {
            return Ok(None);
        };

        // A record we cannot parse is indistinguishable from "not
        // running" to pollers; log it and report no run in flight.
        match serde_json::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(error) => {
                tracing::warn!(%error, "discarding malformed upgrade stage record");
                Ok(None)
            }
        }
    }

    async fn save(&self, record: &StageRecord) -> Result<()> {
        self.settings
            .set(OPT_DATABASE_STAGE, serde_json::to_value(record)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_serializes_stage_as_false_when_drained() {
        let record = StageRecord {
            stage: None,
            stages: vec!["add_title_201".to_string()],
            mode: Mode::Upgrade,
        };

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "stage": false, "stages": ["add_title_201"], "mode": "upgrade" })
        );
    }

    #[test]
    fn record_round_trips_active_stage() {
        let record = StageRecord {
            stage: Some("add_title_201".to_string()),
            stages: vec!["add_title_201".to_string(), "add_group_indices_216".to_string()],
            mode: Mode::Install,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["stage"], json!("add_title_201"));
        assert_eq!(value["mode"], json!("install"));

        let parsed: StageRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn record_parses_legacy_false_stage() {
        let parsed: StageRecord = serde_json::from_value(json!({
            "stage": false,
            "stages": [],
            "mode": "upgrade",
        }))
        .unwrap();

        assert_eq!(parsed.stage, None);
    }
}
