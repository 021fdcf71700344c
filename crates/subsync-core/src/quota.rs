//! The Instagram quota window: an hourly call budget tied to one token.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Length of one quota window, in seconds.
pub const WINDOW_SECS: i64 = 60 * 60;

/// How close to `capacity_limit` the counter may get before calls stop.
/// Concurrent increments can overshoot an exact check by a few.
pub const CAPACITY_BUFFER: u32 = 5;

/// Default Instagram Graph API budget per token per hour.
pub const DEFAULT_CAPACITY: u32 = 200;

/// The persisted quota singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaWindow {
  pub capacity_limit:     u32,
  pub filled_count:       u32,
  pub window_started_at:  DateTime<Utc>,
  pub long_lived_token:   String,
  pub short_lived_token:  String,
  pub token_active:       bool,
}

/// Where the quota lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaState {
  /// No usable long-lived token has been issued yet.
  NoToken,
  /// Calls may proceed with the stored long-lived token.
  Active,
  /// The hourly budget is spent; calls wait for the window to roll over.
  CapacityReached,
  /// The last token exchange failed or the token was rejected.
  Disabled,
}

impl QuotaWindow {
  /// A fresh window with no tokens.
  pub fn new(capacity_limit: u32, now: DateTime<Utc>) -> Self {
    Self {
      capacity_limit,
      filled_count: 0,
      window_started_at: now,
      long_lived_token: String::new(),
      short_lived_token: String::new(),
      token_active: false,
    }
  }

  /// The window rolls over once a full hour has passed since it started.
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.window_started_at + Duration::seconds(WINDOW_SECS)
  }

  /// True once `filled_count` is within [`CAPACITY_BUFFER`] of the limit,
  /// or past it.
  pub fn capacity_reached(&self) -> bool {
    self.filled_count.saturating_add(CAPACITY_BUFFER) >= self.capacity_limit
  }

  /// Classify the window, ignoring any pending rollover.
  pub fn state(&self) -> QuotaState {
    if self.capacity_reached() {
      QuotaState::CapacityReached
    } else if self.token_active && !self.long_lived_token.is_empty() {
      QuotaState::Active
    } else if self.long_lived_token.is_empty() {
      QuotaState::NoToken
    } else {
      QuotaState::Disabled
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn window(filled: u32, capacity: u32) -> QuotaWindow {
    let mut w = QuotaWindow::new(capacity, Utc::now());
    w.filled_count = filled;
    w.long_lived_token = "long".into();
    w.token_active = true;
    w
  }

  #[test]
  fn capacity_buffer_engages_just_below_limit() {
    assert_eq!(window(194, 200).state(), QuotaState::Active);
    assert_eq!(window(195, 200).state(), QuotaState::CapacityReached);
    assert_eq!(window(199, 200).state(), QuotaState::CapacityReached);
    assert_eq!(window(200, 200).state(), QuotaState::CapacityReached);
    assert_eq!(window(205, 200).state(), QuotaState::CapacityReached);
  }

  #[test]
  fn overshoot_stays_reached() {
    assert!(window(260, 200).capacity_reached());
  }

  #[test]
  fn expiry_is_inclusive_at_one_hour() {
    let start = Utc::now();
    let mut w = window(0, 200);
    w.window_started_at = start;
    assert!(!w.is_expired(start + Duration::minutes(59)));
    assert!(w.is_expired(start + Duration::hours(1)));
  }

  #[test]
  fn token_states() {
    let mut w = QuotaWindow::new(200, Utc::now());
    assert_eq!(w.state(), QuotaState::NoToken);
    w.long_lived_token = "long".into();
    assert_eq!(w.state(), QuotaState::Disabled);
    w.token_active = true;
    assert_eq!(w.state(), QuotaState::Active);
  }
}
