//! Error type for `subsync-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] subsync_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("subscriber count {0} does not fit in a database integer")]
  CountOverflow(u64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
