//! Schema upgrade framework for the redirection data layer
//!
//! This module owns everything needed to move the plugin's tables from
//! one schema version to another: the ordered upgrade registry, the
//! crash-resumable status engine, the wire-shaped status projection,
//! and the stage runner that drives one upgrade stage per request.
//!
//! # Architecture
//!
//! An upgrade is an ordered plan of stages. Each stage is one atomic,
//! idempotent DDL step identified by a stable id (`add_title_201`, ...).
//! The engine persists its position in the plan inside a single option
//! slot so the process survives crashes, timeouts, and independent
//! polling requests. The admin UI serializes stage execution: it issues
//! one "step" request, waits for the response, then issues the next.

pub mod reporter;
pub mod runner;
pub mod schema;
pub mod status;
pub mod upgrades;

pub use reporter::{Complete, DatabaseStatus, OutcomeKind, StatusReport};
pub use schema::LatestSchema;
pub use status::{Mode, RunOutcome, UpgradeStatus};
pub use upgrades::{SqlStageExecutor, StageExecutor, UpgradeError};

use anyhow::Result;

use crate::kernel::{get_db_version, SettingsStore};

/// Schema version the registry upgrades to.
pub const DB_VERSION: &str = "2.4.0";

/// One registered schema upgrade.
pub struct Upgrade {
    /// Schema version this upgrade produces.
    pub version: &'static str,
    /// Stable stage id, unique across the registry.
    pub stage: &'static str,
    /// Human-readable description shown in the admin UI.
    pub reason: &'static str,
}

/// All schema upgrades, ordered oldest to newest.
///
/// Add new upgrades to the end of this list and bump [`DB_VERSION`].
pub fn all_upgrades() -> &'static [Upgrade] {
    &[
        Upgrade {
            version: "2.0.1",
            stage: "add_title_201",
            reason: "Add titles to redirects",
        },
        Upgrade {
            version: "2.1.6",
            stage: "add_group_indices_216",
            reason: "Add group indices",
        },
        Upgrade {
            version: "2.2.0",
            stage: "expand_title_size_220",
            reason: "Expand size of redirect titles",
        },
        Upgrade {
            version: "2.3.1",
            stage: "remove_invalid_groups_231",
            reason: "Remove redirects with invalid groups",
        },
        Upgrade {
            version: "2.4.0",
            stage: "convert_title_to_text_240",
            reason: "Convert title to text",
        },
    ]
}

/// Look up the description for a stage id.
pub fn find_upgrade(stage: &str) -> Option<&'static Upgrade> {
    all_upgrades().iter().find(|u| u.stage == stage)
}

/// Compare two dotted version strings component-wise.
///
/// Missing components count as zero, so `"2.2" == "2.2.0"`. The empty
/// string sorts before everything (nothing installed yet).
pub fn version_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    // Unparsable components count as zero so later components stay
    // positionally aligned
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.parse::<u64>().unwrap_or(0))
            .collect()
    };

    let a = parse(a);
    let b = parse(b);
    let len = a.len().max(b.len());

    for i in 0..len {
        let left = a.get(i).copied().unwrap_or(0);
        let right = b.get(i).copied().unwrap_or(0);

        match left.cmp(&right) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }

    std::cmp::Ordering::Equal
}

/// The migration plan provider.
///
/// Given a source schema version, returns the ordered stage ids needed
/// to reach [`DB_VERSION`]. The plan is fixed once handed to
/// [`UpgradeStatus::start_upgrade`] and never re-derived mid-run.
pub struct Database;

impl Database {
    pub fn new() -> Self {
        Self
    }

    /// Stages needed to move from `version` to the current version.
    ///
    /// An empty `version` means nothing is installed and yields the
    /// full plan. A version at or past [`DB_VERSION`] yields an empty
    /// plan (only the version bump remains).
    pub fn get_upgrades_for_version(&self, version: &str) -> Vec<String> {
        all_upgrades()
            .iter()
            .filter(|u| version_cmp(version, u.version) == std::cmp::Ordering::Less)
            .map(|u| u.stage.to_string())
            .collect()
    }

    /// Remaining plan computed from the stored schema version.
    pub async fn get_upgrades(&self, settings: &dyn SettingsStore) -> Result<Vec<String>> {
        let version = get_db_version(settings).await?;
        Ok(self.get_upgrades_for_version(&version))
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn version_ordering() {
        assert_eq!(version_cmp("1.0", "2.4.0"), Ordering::Less);
        assert_eq!(version_cmp("2.4.0", "1.0"), Ordering::Greater);
        assert_eq!(version_cmp("2.2", "2.2.0"), Ordering::Equal);
        assert_eq!(version_cmp("2.1.6", "2.2.0"), Ordering::Less);
        assert_eq!(version_cmp("", "2.0.1"), Ordering::Less);
        assert_eq!(version_cmp("2.10.0", "2.9.0"), Ordering::Greater);
    }

    #[test]
    fn unparsable_component_counts_as_zero() {
        assert_eq!(version_cmp("2.x.1", "2.0.1"), Ordering::Equal);
        assert_eq!(version_cmp("2.x.1", "2.1"), Ordering::Less);
        assert_eq!(version_cmp("2.1.x", "2.1"), Ordering::Equal);
    }

    #[test]
    fn full_plan_for_fresh_install() {
        let database = Database::new();
        let plan = database.get_upgrades_for_version("");

        assert_eq!(plan.len(), all_upgrades().len());
        assert_eq!(plan[0], "add_title_201");
        assert_eq!(plan[plan.len() - 1], "convert_title_to_text_240");
    }

    #[test]
    fn plan_from_old_version_is_ordered() {
        let database = Database::new();
        let plan = database.get_upgrades_for_version("1.0");

        assert_eq!(
            plan,
            vec![
                "add_title_201",
                "add_group_indices_216",
                "expand_title_size_220",
                "remove_invalid_groups_231",
                "convert_title_to_text_240",
            ]
        );
    }

    #[test]
    fn plan_from_mid_version_skips_applied_stages() {
        let database = Database::new();
        let plan = database.get_upgrades_for_version("2.1.6");

        assert_eq!(
            plan,
            vec![
                "expand_title_size_220",
                "remove_invalid_groups_231",
                "convert_title_to_text_240",
            ]
        );
    }

    #[tokio::test]
    async fn get_upgrades_reads_the_stored_version() {
        use crate::kernel::MemorySettings;

        let settings = MemorySettings::new().with_version("2.2.0").await;
        let database = Database::new();

        assert_eq!(
            database.get_upgrades(&settings).await.unwrap(),
            vec!["remove_invalid_groups_231", "convert_title_to_text_240"]
        );
    }

    #[test]
    fn no_plan_at_current_version() {
        let database = Database::new();

        assert!(database.get_upgrades_for_version(DB_VERSION).is_empty());
        assert!(database.get_upgrades_for_version("9.0").is_empty());
    }
}
