//! I/O adapters: config, persistence, model backends and search.

pub mod backend;
pub mod config;
pub mod knowledge_base;
pub mod mission_store;
pub mod process;
pub mod prompt;
pub mod schema;
pub mod trajectory_log;
