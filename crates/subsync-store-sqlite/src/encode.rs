//! Encoding and decoding helpers between domain types and the plain SQLite
//! column representations.
//!
//! Timestamps are stored as RFC 3339 strings, booleans as 0/1 integers and
//! counts as signed 64-bit integers.

use chrono::{DateTime, Utc};
use subsync_core::{
  Platform,
  quota::QuotaWindow,
  store::Cursor,
  subject::{PlatformAccount, Subject},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Counts ──────────────────────────────────────────────────────────────────

pub fn encode_count(count: u64) -> Result<i64> {
  i64::try_from(count).map_err(|_| Error::CountOverflow(count))
}

pub fn decode_count(raw: i64) -> Result<u64> {
  u64::try_from(raw).map_err(|_| Error::Core(subsync_core::Error::InvalidCount(raw)))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// One platform's columns as read from a `subjects` row.
pub struct RawAccount {
  pub handle:       String,
  pub count:        i64,
  pub last_updated: Option<String>,
}

impl RawAccount {
  fn into_account(self) -> Result<PlatformAccount> {
    Ok(PlatformAccount {
      handle:           self.handle,
      subscriber_count: decode_count(self.count)?,
      last_updated:     self.last_updated.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read directly from a `subjects` row.
pub struct RawSubject {
  pub internal_id:    i64,
  pub subject_id:     i64,
  pub telegram:       RawAccount,
  pub has_subscribed: bool,
  pub instagram:      RawAccount,
  pub youtube:        RawAccount,
  pub vk:             RawAccount,
  pub is_active:      bool,
}

impl RawSubject {
  /// Read a row selected with [`crate::schema::SUBJECT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      internal_id:    row.get(0)?,
      subject_id:     row.get(1)?,
      telegram:       RawAccount {
        handle:       row.get(2)?,
        count:        row.get(3)?,
        last_updated: row.get(4)?,
      },
      has_subscribed: row.get(5)?,
      instagram:      RawAccount {
        handle:       row.get(6)?,
        count:        row.get(7)?,
        last_updated: row.get(8)?,
      },
      youtube:        RawAccount {
        handle:       row.get(9)?,
        count:        row.get(10)?,
        last_updated: row.get(11)?,
      },
      vk:             RawAccount {
        handle:       row.get(12)?,
        count:        row.get(13)?,
        last_updated: row.get(14)?,
      },
      is_active:      row.get(15)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      internal_id:    self.internal_id,
      subject_id:     self.subject_id,
      telegram:       self.telegram.into_account()?,
      instagram:      self.instagram.into_account()?,
      youtube:        self.youtube.into_account()?,
      vk:             self.vk.into_account()?,
      has_subscribed: self.has_subscribed,
      is_active:      self.is_active,
    })
  }
}

/// Raw values read directly from a `sync_cursors` row.
pub struct RawCursor {
  pub platform:          String,
  pub last_internal_id:  i64,
  pub last_subject_id:   i64,
  pub last_processed_at: String,
}

impl RawCursor {
  pub fn into_cursor(self) -> Result<Cursor> {
    Ok(Cursor {
      platform:          Platform::parse(&self.platform)?,
      last_internal_id:  self.last_internal_id,
      last_subject_id:   self.last_subject_id,
      last_processed_at: decode_dt(&self.last_processed_at)?,
    })
  }
}

/// Raw values read directly from the `instagram_quota` row.
pub struct RawQuota {
  pub capacity_limit:    i64,
  pub filled_count:      i64,
  pub window_started_at: String,
  pub long_lived_token:  String,
  pub short_lived_token: String,
  pub token_active:      bool,
}

impl RawQuota {
  pub fn into_window(self) -> Result<QuotaWindow> {
    // Negative values can only come from manual edits; clamp them to zero.
    let clamp = |v: i64| u32::try_from(v.max(0)).unwrap_or(u32::MAX);
    Ok(QuotaWindow {
      capacity_limit:    clamp(self.capacity_limit),
      filled_count:      clamp(self.filled_count),
      window_started_at: decode_dt(&self.window_started_at)?,
      long_lived_token:  self.long_lived_token,
      short_lived_token: self.short_lived_token,
      token_active:      self.token_active,
    })
  }
}
