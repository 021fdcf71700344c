//! SQL schema for the subsync SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- internal_id is never reused, so cursors only ever move past it.
CREATE TABLE IF NOT EXISTS subjects (
    internal_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id        INTEGER NOT NULL UNIQUE,
    tg_handle         TEXT    NOT NULL DEFAULT '',
    tg_subs_count     INTEGER NOT NULL DEFAULT 0,
    tg_last_updated   TEXT,
    tg_has_subscribed INTEGER NOT NULL DEFAULT 0,
    inst_handle       TEXT    NOT NULL DEFAULT '',
    inst_subs_count   INTEGER NOT NULL DEFAULT 0,
    inst_last_updated TEXT,
    yt_handle         TEXT    NOT NULL DEFAULT '',
    yt_subs_count     INTEGER NOT NULL DEFAULT 0,
    yt_last_updated   TEXT,
    vk_handle         TEXT    NOT NULL DEFAULT '',
    vk_subs_count     INTEGER NOT NULL DEFAULT 0,
    vk_last_updated   TEXT,
    is_active         INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT    NOT NULL
);

-- One row per platform, created on the first commit.
CREATE TABLE IF NOT EXISTS sync_cursors (
    platform          TEXT    PRIMARY KEY,  -- 'telegram' | 'instagram' | 'youtube' | 'vk'
    last_internal_id  INTEGER NOT NULL,
    last_subject_id   INTEGER NOT NULL,
    last_processed_at TEXT    NOT NULL
);

-- Singleton row (id = 1) seeded at startup.
CREATE TABLE IF NOT EXISTS instagram_quota (
    id                INTEGER PRIMARY KEY CHECK (id = 1),
    capacity_limit    INTEGER NOT NULL,
    filled_count      INTEGER NOT NULL DEFAULT 0,
    window_started_at TEXT    NOT NULL,
    long_lived_token  TEXT    NOT NULL DEFAULT '',
    short_lived_token TEXT    NOT NULL DEFAULT '',
    token_active      INTEGER NOT NULL DEFAULT 0
);

PRAGMA user_version = 1;
";

/// Column names holding one platform's account.
pub struct PlatformColumns {
  pub handle:  &'static str,
  pub count:   &'static str,
  pub updated: &'static str,
}

pub fn platform_columns(platform: subsync_core::Platform) -> PlatformColumns {
  use subsync_core::Platform;

  match platform {
    Platform::Telegram => PlatformColumns {
      handle:  "tg_handle",
      count:   "tg_subs_count",
      updated: "tg_last_updated",
    },
    Platform::Instagram => PlatformColumns {
      handle:  "inst_handle",
      count:   "inst_subs_count",
      updated: "inst_last_updated",
    },
    Platform::Youtube => PlatformColumns {
      handle:  "yt_handle",
      count:   "yt_subs_count",
      updated: "yt_last_updated",
    },
    Platform::Vk => PlatformColumns {
      handle:  "vk_handle",
      count:   "vk_subs_count",
      updated: "vk_last_updated",
    },
  }
}

/// Column list matching [`crate::encode::RawSubject::from_row`].
pub const SUBJECT_COLUMNS: &str = "
    internal_id, subject_id,
    tg_handle, tg_subs_count, tg_last_updated, tg_has_subscribed,
    inst_handle, inst_subs_count, inst_last_updated,
    yt_handle, yt_subs_count, yt_last_updated,
    vk_handle, vk_subs_count, vk_last_updated,
    is_active";
