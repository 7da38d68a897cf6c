//! Postgres-backed implementation of the settings store.
//!
//! Options live in a single `redirect_options` table keyed by name, with
//! the value stored as JSONB. Writes are upserts so a set never depends
//! on whether the option already exists.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use super::traits::SettingsStore;

/// Option key holding the installed schema version (dotted string).
pub const OPT_DATABASE_VERSION: &str = "database";

/// Option key holding the in-flight upgrade record.
pub const OPT_DATABASE_STAGE: &str = "database_stage";

/// Settings store backed by the `redirect_options` table.
#[derive(Clone)]
pub struct PostgresSettings {
    pool: PgPool,
}

impl PostgresSettings {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PostgresSettings {
    async fn get(&self, name: &str) -> Result<Option<Value>> {
        sqlx::query_scalar::<_, Value>(
            "SELECT value FROM redirect_options WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn set(&self, name: &str, value: Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO redirect_options (name, value)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET
                value = $2,
                updated_at = NOW()
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM redirect_options WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Read the stored schema version, `""` when nothing is installed.
pub async fn get_db_version(settings: &dyn SettingsStore) -> Result<String> {
    let value = settings.get(OPT_DATABASE_VERSION).await?;

    Ok(value
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default())
}

/// Overwrite the stored schema version.
pub async fn set_db_version(settings: &dyn SettingsStore, version: &str) -> Result<()> {
    settings
        .set(OPT_DATABASE_VERSION, Value::String(version.to_string()))
        .await
}
