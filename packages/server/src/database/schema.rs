//! Expected target schema for the plugin tables.
//!
//! Used only for diagnostics: when a stage fails, a snapshot of the
//! schema the upgrade was driving towards is attached to the status
//! payload so an operator can compare it against the live database.

use serde_json::{json, Value};

/// Describes the schema at [`super::DB_VERSION`].
pub struct LatestSchema;

impl LatestSchema {
    pub fn new() -> Self {
        Self
    }

    /// JSON snapshot of every table the plugin owns.
    pub fn get_table_schema(&self) -> Value {
        json!([
            {
                "table": "redirect_items",
                "columns": [
                    { "name": "id", "type": "BIGSERIAL", "primary_key": true },
                    { "name": "url", "type": "TEXT", "nullable": false },
                    { "name": "match_url", "type": "TEXT", "nullable": true },
                    { "name": "title", "type": "TEXT", "nullable": true },
                    { "name": "group_id", "type": "BIGINT", "nullable": false },
                    { "name": "action_type", "type": "VARCHAR(20)", "nullable": false },
                    { "name": "action_code", "type": "INT", "nullable": false },
                    { "name": "action_data", "type": "TEXT", "nullable": true },
                    { "name": "last_access", "type": "TIMESTAMPTZ", "nullable": true },
                    { "name": "hits", "type": "BIGINT", "default": 0 },
                ],
                "indexes": ["url", "group_id", "last_access"],
            },
            {
                "table": "redirect_groups",
                "columns": [
                    { "name": "id", "type": "BIGSERIAL", "primary_key": true },
                    { "name": "name", "type": "TEXT", "nullable": false },
                    { "name": "module_id", "type": "INT", "nullable": false },
                    { "name": "status", "type": "VARCHAR(20)", "default": "enabled" },
                    { "name": "position", "type": "INT", "default": 0 },
                ],
                "indexes": ["module_id", "status"],
            },
            {
                "table": "redirect_logs",
                "columns": [
                    { "name": "id", "type": "BIGSERIAL", "primary_key": true },
                    { "name": "created_at", "type": "TIMESTAMPTZ", "nullable": false },
                    { "name": "url", "type": "TEXT", "nullable": false },
                    { "name": "sent_to", "type": "TEXT", "nullable": true },
                    { "name": "agent", "type": "TEXT", "nullable": true },
                    { "name": "referrer", "type": "TEXT", "nullable": true },
                    { "name": "redirection_id", "type": "BIGINT", "nullable": true },
                    { "name": "ip", "type": "INET", "nullable": true },
                ],
                "indexes": ["created_at", "redirection_id", "ip"],
            },
            {
                "table": "redirect_404",
                "columns": [
                    { "name": "id", "type": "BIGSERIAL", "primary_key": true },
                    { "name": "created_at", "type": "TIMESTAMPTZ", "nullable": false },
                    { "name": "url", "type": "TEXT", "nullable": false },
                    { "name": "agent", "type": "TEXT", "nullable": true },
                    { "name": "referrer", "type": "TEXT", "nullable": true },
                    { "name": "ip", "type": "INET", "nullable": true },
                ],
                "indexes": ["created_at", "url", "ip"],
            },
            {
                "table": "redirect_options",
                "columns": [
                    { "name": "name", "type": "TEXT", "primary_key": true },
                    { "name": "value", "type": "JSONB", "nullable": false },
                    { "name": "updated_at", "type": "TIMESTAMPTZ", "nullable": false },
                ],
                "indexes": [],
            },
        ])
    }
}

impl Default for LatestSchema {
    fn default() -> Self {
        Self::new()
    }
}
