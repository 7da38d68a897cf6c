// Redirectify - URL redirection management plugin, API core
//
// This crate provides the server-side data layer and admin API for the
// redirection plugin. The heart of it is the database upgrade status
// engine in `database/`: a crash-resumable state machine that applies
// schema upgrades one stage per request cycle.

pub mod config;
pub mod database;
pub mod kernel;
pub mod server;

pub use config::*;
