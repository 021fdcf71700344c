//! Process wiring for the subscriber-sync service: configuration, signal
//! handling, and assembly of the scheduler from enabled platforms.

pub mod app;
pub mod config;
pub mod shutdown;

pub use config::ServerConfig;
