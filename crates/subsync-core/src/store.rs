//! Storage traits consumed by the sync engine and the API.
//!
//! Implemented by storage backends (e.g. `subsync-store-sqlite`). The engine
//! depends only on these abstractions.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Platform,
  quota::QuotaWindow,
  subject::{NewSubject, Subject, SubjectPatch},
};

/// Sweep progress for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
  pub platform:          Platform,
  /// `internal_id` of the last subject attempted.
  pub last_internal_id:  i64,
  pub last_subject_id:   i64,
  pub last_processed_at: DateTime<Utc>,
}

// ─── Roster ──────────────────────────────────────────────────────────────────

/// The subject roster plus the per-platform sweep cursors.
///
/// All methods return `Send` futures so the trait can be used from tasks
/// spawned on a multi-threaded tokio runtime.
pub trait RosterStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Persist a new subject. Fails if it has no handles or if `subject_id`
  /// is already taken.
  fn create_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// Look a subject up by its external id.
  fn get_subject(
    &self,
    subject_id: i64,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Apply a partial update. Returns `None` if the subject does not exist.
  fn update_subject(
    &self,
    subject_id: i64,
    patch: SubjectPatch,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  // ── Sync reads and writes ─────────────────────────────────────────────

  /// Up to `limit` subjects with `internal_id > cursor_id` and a non-empty
  /// handle on `platform`, ordered by `internal_id` ascending.
  fn get_subjects_after(
    &self,
    platform: Platform,
    cursor_id: i64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  /// Store a fresh follower count and stamp `last_updated`.
  fn update_count(
    &self,
    subject_id: i64,
    platform: Platform,
    count: u64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Record whether the polling identity is a member of the subject's
  /// Telegram channel.
  fn set_has_subscribed(
    &self,
    subject_id: i64,
    subscribed: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Cursors ───────────────────────────────────────────────────────────

  /// The stored cursor for `platform`, or `None` before the first sync.
  fn get_cursor(
    &self,
    platform: Platform,
  ) -> impl Future<Output = Result<Option<Cursor>, Self::Error>> + Send + '_;

  /// Upsert the cursor for `platform`.
  fn set_cursor(
    &self,
    platform: Platform,
    internal_id: i64,
    subject_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Quota ───────────────────────────────────────────────────────────────────

/// Persistence for the Instagram [`QuotaWindow`] singleton.
pub trait QuotaStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get_quota(
    &self,
  ) -> impl Future<Output = Result<QuotaWindow, Self::Error>> + Send + '_;

  /// Store a freshly exchanged long-lived token and mark it active.
  fn set_token(
    &self,
    long_lived_token: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Mark the stored token inactive so the next tick refreshes it.
  fn disable_token(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Count one call against the current window.
  fn increment_filled(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Zero the counter and start a new window at `started_at`.
  fn reset_window(
    &self,
    started_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
