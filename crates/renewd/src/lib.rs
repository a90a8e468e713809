//! renewd library - exposes modules for testing.

pub mod config;
pub mod decoder;
pub mod dispatch;
pub mod orchestrator;
pub mod probe;
pub mod routes;
pub mod runner;
pub mod server;
