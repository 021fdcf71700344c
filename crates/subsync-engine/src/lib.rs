//! The incremental multi-platform subscriber-sync engine.
//!
//! A [`Scheduler`] drives one [`SyncWorker`] per enabled platform. Each
//! worker pulls small batches from a [`BatchSelector`], asks its platform
//! adapter for follower counts, and commits the platform cursor after every
//! subject so a restart resumes exactly where the last run stopped.
//! Instagram calls are additionally gated by a [`QuotaTracker`].

pub mod batch;
pub mod error;
pub mod gate;
pub mod quota;
pub mod scheduler;
pub mod worker;

pub use batch::{Batch, BatchSelector};
pub use error::{Error, Result};
pub use gate::{CallGate, Ungated};
pub use quota::QuotaTracker;
pub use scheduler::{ScheduleConfig, Scheduler, Sweep, TickSummary};
pub use worker::{SweepReport, SyncWorker};

#[cfg(test)]
mod testing;
