//! HTTP route handlers.

pub mod database;
pub mod health;

pub use database::{
    database_start_handler, database_status_handler, database_step_handler,
    database_stop_handler,
};
pub use health::health_handler;
