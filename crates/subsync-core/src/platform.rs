//! The fixed set of social platforms a subject can be tracked on.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::Error;

/// A social platform with a follower count worth tracking.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
  Telegram,
  Instagram,
  Youtube,
  Vk,
}

impl Platform {
  /// Human-facing name used in alerts.
  pub fn display_name(self) -> &'static str {
    match self {
      Platform::Telegram => "Telegram",
      Platform::Instagram => "Instagram",
      Platform::Youtube => "YouTube",
      Platform::Vk => "VK",
    }
  }

  /// Parse a platform from its lowercase storage key.
  pub fn parse(s: &str) -> crate::Result<Self> {
    s.parse().map_err(|_| Error::UnknownPlatform(s.to_owned()))
  }
}

// ─── Fetch outcome ───────────────────────────────────────────────────────────

/// The classified result of asking a platform for a follower count.
///
/// Adapters never return `Err`; every upstream failure mode maps to exactly
/// one of these variants so the sync worker can pick a recovery action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  /// The handle resolved and the platform reported this many followers.
  /// Zero is a valid value and may also mean "count unknown" upstream.
  Count(u64),
  /// The handle resolves to nothing, or to something that is not a
  /// channel (e.g. an individual Telegram user).
  NotFound,
  /// The platform asked the caller to back off.
  RateLimited { retry_after: Duration },
  /// Network or unclassified failure; retried on the next sweep.
  Transient(String),
  /// The access token was rejected.
  TokenInvalid(String),
}

impl FetchOutcome {
  pub fn transient(cause: impl Into<String>) -> Self {
    Self::Transient(cause.into())
  }

  pub fn token_invalid(cause: impl Into<String>) -> Self {
    Self::TokenInvalid(cause.into())
  }
}

/// Credentials handed to an adapter for one call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthContext {
  /// The adapter carries its own credentials.
  #[default]
  Ambient,
  /// A token issued for this tick (Instagram long-lived token).
  Token(String),
}

impl AuthContext {
  pub fn token(&self) -> Option<&str> {
    match self {
      AuthContext::Ambient => None,
      AuthContext::Token(t) => Some(t),
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn storage_keys_roundtrip() {
    for p in Platform::iter() {
      assert_eq!(Platform::parse(p.as_ref()).unwrap(), p);
    }
    assert_eq!(Platform::Youtube.as_ref(), "youtube");
  }

  #[test]
  fn unknown_platform_is_rejected() {
    let err = Platform::parse("myspace").unwrap_err();
    assert!(matches!(err, Error::UnknownPlatform(s) if s == "myspace"));
  }

  #[test]
  fn serde_uses_lowercase_keys() {
    let json = serde_json::to_string(&Platform::Vk).unwrap();
    assert_eq!(json, "\"vk\"");
  }
}
