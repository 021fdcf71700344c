//! Error type for `subsync-engine`.
//!
//! Platform failures are not errors here; they arrive as `FetchOutcome`
//! values and are handled inside the worker. What remains are storage
//! failures and bad configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("invalid schedule: {0}")]
  InvalidSchedule(String),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
