// TestDependencies - mock implementations for testing
//
// Provides an in-memory settings store that can be injected into the
// upgrade engine for tests, with no database required.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::settings::OPT_DATABASE_VERSION;
use super::traits::SettingsStore;

// =============================================================================
// Mock Settings Store
// =============================================================================

/// In-memory settings store with the same last-writer-wins semantics as
/// the Postgres implementation.
#[derive(Default)]
pub struct MemorySettings {
    options: RwLock<HashMap<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the stored schema version, mirroring a previous install.
    pub async fn with_version(self, version: &str) -> Self {
        self.options.write().await.insert(
            OPT_DATABASE_VERSION.to_string(),
            Value::String(version.to_string()),
        );
        self
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.options.read().await.get(name).cloned())
    }

    async fn set(&self, name: &str, value: Value) -> Result<()> {
        self.options.write().await.insert(name.to_string(), value);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.options.write().await.remove(name);
        Ok(())
    }
}
