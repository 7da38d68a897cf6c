//! Stage execution
//!
//! The engine treats stages as opaque ids; this module supplies the
//! bodies. Each stage is idempotent DDL so a crashed or retried stage
//! can run again safely.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use super::find_upgrade;

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("unknown upgrade stage '{0}'")]
    UnknownStage(String),

    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Executes one stage body, returning the human-readable reason shown
/// in the admin UI on success.
///
/// Time limits belong to the stage body, not the engine; a stage that
/// needs a statement timeout sets its own.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(&self, stage: &str) -> Result<String, UpgradeError>;
}

/// Stage executor running DDL against the live database.
pub struct SqlStageExecutor {
    pool: PgPool,
}

impl SqlStageExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run(&self, stage: &str, statements: &[&str]) -> Result<(), UpgradeError> {
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|source| UpgradeError::StageFailed {
                    stage: stage.to_string(),
                    source,
                })?;
        }

        Ok(())
    }
}

#[async_trait]
impl StageExecutor for SqlStageExecutor {
    async fn execute(&self, stage: &str) -> Result<String, UpgradeError> {
        let statements: &[&str] = match stage {
            "add_title_201" => &[
                "ALTER TABLE redirect_items ADD COLUMN IF NOT EXISTS title VARCHAR(50)",
            ],
            "add_group_indices_216" => &[
                "CREATE INDEX IF NOT EXISTS redirect_groups_module_idx ON redirect_groups (module_id)",
                "CREATE INDEX IF NOT EXISTS redirect_groups_status_idx ON redirect_groups (status)",
            ],
            "expand_title_size_220" => &[
                "ALTER TABLE redirect_items ALTER COLUMN title TYPE VARCHAR(500)",
            ],
            "remove_invalid_groups_231" => &[
                "DELETE FROM redirect_items WHERE group_id NOT IN (SELECT id FROM redirect_groups)",
            ],
            "convert_title_to_text_240" => &[
                "ALTER TABLE redirect_items ALTER COLUMN title TYPE TEXT",
            ],
            unknown => return Err(UpgradeError::UnknownStage(unknown.to_string())),
        };

        self.run(stage, statements).await?;

        // Registry membership is checked above; the reason always exists
        let reason = find_upgrade(stage)
            .map(|upgrade| upgrade.reason.to_string())
            .unwrap_or_else(|| stage.to_string());

        Ok(reason)
    }
}
