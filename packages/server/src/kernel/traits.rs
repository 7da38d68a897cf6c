// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "advance the upgrade") should be database-module
// functions that use these traits.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

// =============================================================================
// Settings Store Trait (Infrastructure - key-value option storage)
// =============================================================================

/// Key-value option storage owned by the host CMS.
///
/// Values are arbitrary JSON documents, overwritten wholesale on every
/// `set`. The upgrade engine never caches a value between calls; every
/// operation re-reads its slot through this trait.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read an option by name. `None` when the option has never been set.
    async fn get(&self, name: &str) -> Result<Option<Value>>;

    /// Write an option, replacing any previous value.
    async fn set(&self, name: &str, value: Value) -> Result<()>;

    /// Remove an option. Removing a missing option is not an error.
    async fn delete(&self, name: &str) -> Result<()>;
}
