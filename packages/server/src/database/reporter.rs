//! Status projection
//!
//! Pure function from an explicit state snapshot to the wire-shaped
//! status payload. All of the status-string priority lives in one
//! exhaustive match; conditional fields are omitted entirely rather
//! than emitted as null.

use serde::Serialize;
use serde_json::Value;

use super::status::{Mode, RunOutcome, StageRecord};
use super::version_cmp;

/// Wire status string, in derivation-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseStatus {
    Ok,
    NeedUpdate,
    NeedInstall,
    FinishUpdate,
    FinishInstall,
}

/// `result` field value: the kind of the attached outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Ok,
    Error,
}

/// Progress through the plan.
///
/// The terminal display state reports the integer `100`; everything
/// else is fractional plan position. Untagged so the two serialize as
/// plain numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Complete {
    Done(u8),
    Partial(f64),
}

impl Complete {
    pub fn done() -> Self {
        Self::Done(100)
    }
}

/// The status payload polled by the admin UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub status: DatabaseStatus,
    #[serde(rename = "inProgress")]
    pub in_progress: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete: Option<Complete>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OutcomeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
    /// Volatile; excluded from payload equality by consumers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<Value>,
}

/// Everything the projection needs, read once by the caller.
pub struct StatusSnapshot<'a> {
    /// The persisted run record, absent when not running.
    pub record: Option<&'a StageRecord>,
    /// Terminal display state from `finish()`, if any.
    pub finished: Option<Mode>,
    /// Outcome attached via `set_ok`/`set_error` this request.
    pub attached: Option<&'a RunOutcome>,
    /// Live outcome supplied by the caller of `get_json`.
    pub live: Option<&'a RunOutcome>,
    /// Installed schema version, `""` when nothing is installed.
    pub stored_version: &'a str,
    /// Version the upgrade registry produces.
    pub target_version: &'a str,
    /// Collaborator-provided API descriptor, emitted on need-install.
    pub api: Option<Value>,
}

enum RunState<'a> {
    NotRunning,
    Running {
        mode: Mode,
        stage: Option<&'a str>,
        stages: &'a [String],
    },
    Finished(Mode),
}

/// Project a snapshot into the wire payload.
pub fn project(snapshot: StatusSnapshot<'_>) -> StatusReport {
    let state = match (snapshot.finished, snapshot.record) {
        (Some(mode), _) => RunState::Finished(mode),
        (None, None) => RunState::NotRunning,
        (None, Some(record)) => RunState::Running {
            mode: record.mode,
            stage: record.stage.as_deref(),
            stages: &record.stages,
        },
    };

    // First matching rule wins; NotRunning derives from the version
    // comparison, everything else from the run itself.
    let status = match &state {
        RunState::NotRunning => {
            if version_cmp(snapshot.stored_version, snapshot.target_version)
                == std::cmp::Ordering::Equal
            {
                DatabaseStatus::Ok
            } else if snapshot.stored_version.is_empty() {
                DatabaseStatus::NeedInstall
            } else {
                DatabaseStatus::NeedUpdate
            }
        }
        RunState::Finished(Mode::Install) => DatabaseStatus::FinishInstall,
        RunState::Finished(Mode::Upgrade) => DatabaseStatus::FinishUpdate,
        RunState::Running {
            mode: Mode::Install,
            ..
        } => DatabaseStatus::NeedInstall,
        RunState::Running {
            mode: Mode::Upgrade,
            ..
        } => DatabaseStatus::NeedUpdate,
    };

    let in_progress = matches!(
        &state,
        RunState::Running {
            stage: Some(_),
            ..
        }
    );

    if status == DatabaseStatus::Ok {
        return StatusReport {
            status,
            in_progress,
            current: None,
            next: None,
            complete: None,
            result: None,
            reason: None,
            debug: None,
            time: None,
            api: None,
        };
    }

    let finished = matches!(&state, RunState::Finished(_));

    let complete = if finished {
        Some(Complete::done())
    } else if let RunState::Running {
        stage: Some(stage),
        stages,
        ..
    } = &state
    {
        Some(Complete::Partial(plan_progress(stage, stages)))
    } else {
        None
    };

    // The live outcome takes precedence over the attached one; the
    // terminal display state keeps the reason but drops result/debug.
    let outcome = snapshot.live.or(snapshot.attached);
    let result = if finished {
        None
    } else {
        outcome.map(|outcome| {
            if outcome.is_error() {
                OutcomeKind::Error
            } else {
                OutcomeKind::Ok
            }
        })
    };
    let reason = outcome.map(|outcome| outcome.reason().to_string());
    let debug = if finished {
        None
    } else {
        outcome.and_then(|outcome| outcome.debug().cloned())
    };

    let (current, next) = if finished {
        (None, None)
    } else {
        let current = if snapshot.stored_version.is_empty() {
            "-".to_string()
        } else {
            snapshot.stored_version.to_string()
        };
        (Some(current), Some(snapshot.target_version.to_string()))
    };

    let api = if status == DatabaseStatus::NeedInstall {
        snapshot.api
    } else {
        None
    };

    StatusReport {
        status,
        in_progress,
        current,
        next,
        complete,
        result,
        reason,
        debug,
        time: Some(chrono::Utc::now().timestamp()),
        api,
    }
}

/// Percentage position of `stage` within the plan.
///
/// `0.0` at the first stage, or when the stage was seeked outside the
/// plan, or when the plan is empty but a version bump is still pending.
fn plan_progress(stage: &str, stages: &[String]) -> f64 {
    if stages.is_empty() {
        return 0.0;
    }

    let index = stages
        .iter()
        .position(|candidate| candidate == stage)
        .unwrap_or(0);

    index as f64 / stages.len() as f64 * 100.0
}
