//! Error types for `subsync-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("a subject needs at least one non-empty platform handle")]
  NoHandles,

  #[error("subject {0} already exists")]
  DuplicateSubject(i64),

  #[error("subscriber count out of range: {0}")]
  InvalidCount(i64),

  #[error("unknown platform: {0:?}")]
  UnknownPlatform(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
