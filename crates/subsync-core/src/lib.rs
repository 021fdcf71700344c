//! Core types and trait definitions for the subsync follower-count tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends, platform clients and the sync engine all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod adapter;
pub mod error;
pub mod notify;
pub mod platform;
pub mod quota;
pub mod store;
pub mod subject;

pub use error::{Error, Result};
pub use platform::Platform;
