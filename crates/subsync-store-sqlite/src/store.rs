//! [`SqliteStore`] — the SQLite implementation of [`RosterStore`] and
//! [`QuotaStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use subsync_core::{
  Platform,
  quota::{DEFAULT_CAPACITY, QuotaWindow},
  store::{Cursor, QuotaStore, RosterStore},
  subject::{NewSubject, Subject, SubjectPatch},
};

use crate::{
  Error, Result,
  encode::{RawCursor, RawQuota, RawSubject, encode_count, encode_dt},
  schema::{SCHEMA, SUBJECT_COLUMNS, platform_columns},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A subsync store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let now_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;
        conn.execute(
          "INSERT OR IGNORE INTO instagram_quota (id, capacity_limit, window_started_at)
           VALUES (1, ?1, ?2)",
          rusqlite::params![DEFAULT_CAPACITY, now_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Apply deployment settings to the quota row: the hourly capacity and,
  /// if given, a new short-lived token to exchange on the next tick.
  pub async fn configure_quota(
    &self,
    capacity_limit:    u32,
    short_lived_token: Option<String>,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE instagram_quota SET capacity_limit = ?1 WHERE id = 1",
          rusqlite::params![capacity_limit],
        )?;
        if let Some(token) = short_lived_token {
          conn.execute(
            "UPDATE instagram_quota
             SET short_lived_token = ?1, token_active = 0
             WHERE id = 1 AND short_lived_token != ?1",
            rusqlite::params![token],
          )?;
        }
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Write handles and the active flag. `tg_has_subscribed` is cleared only
  /// when the stored Telegram handle actually changes, so a join recorded
  /// by a sweep in the meantime survives an unrelated edit.
  pub(crate) async fn write_subject(&self, subject: &Subject) -> Result<()> {
    let subject_id = subject.subject_id;
    let tg         = subject.telegram.handle.clone();
    let inst       = subject.instagram.handle.clone();
    let yt         = subject.youtube.handle.clone();
    let vk         = subject.vk.handle.clone();
    let active     = subject.is_active;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE subjects SET
             tg_has_subscribed = CASE WHEN tg_handle = ?1 THEN tg_has_subscribed ELSE 0 END,
             tg_handle = ?1, inst_handle = ?2, yt_handle = ?3, vk_handle = ?4,
             is_active = ?5
           WHERE subject_id = ?6",
          rusqlite::params![tg, inst, yt, vk, active, subject_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RosterStore impl ────────────────────────────────────────────────────────

impl RosterStore for SqliteStore {
  type Error = Error;

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn create_subject(&self, input: NewSubject) -> Result<Subject> {
    input.validate()?;

    let subject_id = input.subject_id;
    let handles    = input.handles;
    let at_str     = encode_dt(Utc::now());

    let inserted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO subjects (
             subject_id, tg_handle, inst_handle, yt_handle, vk_handle, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (subject_id) DO NOTHING",
          rusqlite::params![
            subject_id,
            handles.telegram.trim(),
            handles.instagram.trim(),
            handles.youtube.trim(),
            handles.vk.trim(),
            at_str,
          ],
        )?)
      })
      .await?;

    if inserted == 0 {
      return Err(subsync_core::Error::DuplicateSubject(subject_id).into());
    }

    self
      .get_subject(subject_id)
      .await?
      .ok_or_else(|| subsync_core::Error::DuplicateSubject(subject_id).into())
  }

  async fn get_subject(&self, subject_id: i64) -> Result<Option<Subject>> {
    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE subject_id = ?1"),
            rusqlite::params![subject_id],
            RawSubject::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn update_subject(
    &self,
    subject_id: i64,
    patch:      SubjectPatch,
  ) -> Result<Option<Subject>> {
    let mut subject = match self.get_subject(subject_id).await? {
      Some(s) => s,
      None    => return Ok(None),
    };

    patch.apply(&mut subject);
    subject.validate()?;
    self.write_subject(&subject).await?;
    self.get_subject(subject_id).await
  }

  // ── Sync reads and writes ─────────────────────────────────────────────────

  async fn get_subjects_after(
    &self,
    platform:  Platform,
    cursor_id: i64,
    limit:     usize,
  ) -> Result<Vec<Subject>> {
    let handle_col = platform_columns(platform).handle;
    let limit_val  = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBJECT_COLUMNS}
           FROM subjects
           WHERE internal_id > ?1
             AND TRIM({handle_col}) != ''
           ORDER BY internal_id ASC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![cursor_id, limit_val], RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn update_count(
    &self,
    subject_id: i64,
    platform:   Platform,
    count:      u64,
  ) -> Result<()> {
    let cols      = platform_columns(platform);
    let count_val = encode_count(count)?;
    let at_str    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "UPDATE subjects SET {} = ?1, {} = ?2 WHERE subject_id = ?3",
            cols.count, cols.updated
          ),
          rusqlite::params![count_val, at_str, subject_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn set_has_subscribed(&self, subject_id: i64, subscribed: bool) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE subjects SET tg_has_subscribed = ?1 WHERE subject_id = ?2",
          rusqlite::params![subscribed, subject_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Cursors ───────────────────────────────────────────────────────────────

  async fn get_cursor(&self, platform: Platform) -> Result<Option<Cursor>> {
    let key = platform.as_ref().to_owned();

    let raw: Option<RawCursor> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT platform, last_internal_id, last_subject_id, last_processed_at
             FROM sync_cursors WHERE platform = ?1",
            rusqlite::params![key],
            |row| {
              Ok(RawCursor {
                platform:          row.get(0)?,
                last_internal_id:  row.get(1)?,
                last_subject_id:   row.get(2)?,
                last_processed_at: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCursor::into_cursor).transpose()
  }

  async fn set_cursor(
    &self,
    platform:    Platform,
    internal_id: i64,
    subject_id:  i64,
  ) -> Result<()> {
    let key    = platform.as_ref().to_owned();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sync_cursors (platform, last_internal_id, last_subject_id, last_processed_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (platform) DO UPDATE SET
             last_internal_id  = excluded.last_internal_id,
             last_subject_id   = excluded.last_subject_id,
             last_processed_at = excluded.last_processed_at",
          rusqlite::params![key, internal_id, subject_id, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── QuotaStore impl ─────────────────────────────────────────────────────────

impl QuotaStore for SqliteStore {
  type Error = Error;

  async fn get_quota(&self) -> Result<QuotaWindow> {
    let raw: RawQuota = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT capacity_limit, filled_count, window_started_at,
                  long_lived_token, short_lived_token, token_active
           FROM instagram_quota WHERE id = 1",
          [],
          |row| {
            Ok(RawQuota {
              capacity_limit:    row.get(0)?,
              filled_count:      row.get(1)?,
              window_started_at: row.get(2)?,
              long_lived_token:  row.get(3)?,
              short_lived_token: row.get(4)?,
              token_active:      row.get(5)?,
            })
          },
        )?)
      })
      .await?;

    raw.into_window()
  }

  async fn set_token(&self, long_lived_token: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE instagram_quota SET long_lived_token = ?1, token_active = 1 WHERE id = 1",
          rusqlite::params![long_lived_token],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn disable_token(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute("UPDATE instagram_quota SET token_active = 0 WHERE id = 1", [])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn increment_filled(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute(
          "UPDATE instagram_quota SET filled_count = filled_count + 1 WHERE id = 1",
          [],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn reset_window(&self, started_at: DateTime<Utc>) -> Result<()> {
    let at_str = encode_dt(started_at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE instagram_quota SET filled_count = 0, window_started_at = ?1 WHERE id = 1",
          rusqlite::params![at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
