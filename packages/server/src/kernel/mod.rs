//! Kernel module - server infrastructure and dependencies.

pub mod settings;
pub mod test_dependencies;
pub mod traits;

pub use settings::{
    get_db_version, set_db_version, PostgresSettings, OPT_DATABASE_STAGE, OPT_DATABASE_VERSION,
};
pub use test_dependencies::MemorySettings;
pub use traits::SettingsStore;
