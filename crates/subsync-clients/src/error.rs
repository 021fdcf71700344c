//! Error type for `subsync-clients`.
//!
//! Only client construction can fail with an `Err`; calls against a platform
//! report their failures as `FetchOutcome` values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Http(#[from] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
