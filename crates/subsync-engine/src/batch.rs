//! Cursor-driven batch selection.
//!
//! The cursor for a platform is the `internal_id` of the last subject that
//! was attempted. A batch is the next few eligible subjects past it; once the
//! roster is exhausted the selection wraps to the start.

use std::sync::Arc;

use subsync_core::{Platform, store::RosterStore, subject::Subject};

use crate::{Error, Result};

/// Subjects to process next, ordered by `internal_id`.
#[derive(Debug, Clone)]
pub struct Batch {
  pub platform: Platform,
  pub subjects: Vec<Subject>,
  /// Whether this batch restarted the sweep from the beginning.
  pub wrapped:  bool,
}

impl Batch {
  pub fn is_empty(&self) -> bool { self.subjects.is_empty() }
}

pub struct BatchSelector<S> {
  store:      Arc<S>,
  batch_size: usize,
}

impl<S: RosterStore> BatchSelector<S> {
  pub fn new(store: Arc<S>, batch_size: usize) -> Self {
    Self { store, batch_size: batch_size.max(1) }
  }

  /// Current cursor position; `0` before the first commit.
  pub async fn position(&self, platform: Platform) -> Result<i64> {
    Ok(
      self
        .store
        .get_cursor(platform)
        .await
        .map_err(Error::store)?
        .map(|c| c.last_internal_id)
        .unwrap_or(0),
    )
  }

  /// The next batch past the cursor, wrapping to the start of the roster
  /// when nothing eligible remains past it.
  pub async fn next_batch(&self, platform: Platform) -> Result<Batch> {
    let position = self.position(platform).await?;

    let subjects = self
      .store
      .get_subjects_after(platform, position, self.batch_size)
      .await
      .map_err(Error::store)?;
    if !subjects.is_empty() || position == 0 {
      return Ok(Batch { platform, subjects, wrapped: false });
    }

    let subjects = self
      .store
      .get_subjects_after(platform, 0, self.batch_size)
      .await
      .map_err(Error::store)?;
    tracing::info!(%platform, "sweep complete, wrapping to the start of the roster");
    Ok(Batch { platform, subjects, wrapped: true })
  }

  /// Move the cursor past `subject`.
  pub async fn commit(&self, platform: Platform, subject: &Subject) -> Result<()> {
    self
      .store
      .set_cursor(platform, subject.internal_id, subject.subject_id)
      .await
      .map_err(Error::store)
  }
}
