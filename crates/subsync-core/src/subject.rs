//! Subjects: one tracked professional and their per-platform accounts.
//!
//! A subject is identified externally by a caller-assigned `subject_id` and
//! internally by a storage-assigned, monotonically increasing `internal_id`.
//! The internal id is what sync cursors walk over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Platform, Result};

/// Marks a handle as a pasted URL rather than an account name.
const URL_MARKER: &str = "http";

/// A subject's account on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlatformAccount {
  pub handle:           String,
  pub subscriber_count: u64,
  pub last_updated:     Option<DateTime<Utc>>,
}

impl PlatformAccount {
  pub fn with_handle(handle: impl Into<String>) -> Self {
    Self { handle: handle.into(), ..Self::default() }
  }

  pub fn is_tracked(&self) -> bool { !self.handle.trim().is_empty() }

  /// Whether the handle looks like a URL. Such handles are never sent to a
  /// platform; they are reported as not found instead.
  pub fn is_malformed(&self) -> bool {
    self.handle.to_ascii_lowercase().contains(URL_MARKER)
  }
}

/// A tracked professional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub internal_id:    i64,
  pub subject_id:     i64,
  pub telegram:       PlatformAccount,
  pub instagram:      PlatformAccount,
  pub youtube:        PlatformAccount,
  pub vk:             PlatformAccount,
  /// Whether the polling identity has joined the Telegram channel.
  pub has_subscribed: bool,
  pub is_active:      bool,
}

impl Subject {
  pub fn account(&self, platform: Platform) -> &PlatformAccount {
    match platform {
      Platform::Telegram => &self.telegram,
      Platform::Instagram => &self.instagram,
      Platform::Youtube => &self.youtube,
      Platform::Vk => &self.vk,
    }
  }

  pub fn account_mut(&mut self, platform: Platform) -> &mut PlatformAccount {
    match platform {
      Platform::Telegram => &mut self.telegram,
      Platform::Instagram => &mut self.instagram,
      Platform::Youtube => &mut self.youtube,
      Platform::Vk => &mut self.vk,
    }
  }

  pub fn handle(&self, platform: Platform) -> &str { &self.account(platform).handle }

  /// Reject a subject left without a tracked handle on any platform.
  pub fn validate(&self) -> Result<()> {
    if [&self.telegram, &self.instagram, &self.youtube, &self.vk]
      .iter()
      .any(|a| a.is_tracked())
    {
      Ok(())
    } else {
      Err(Error::NoHandles)
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// The per-platform handles supplied when a subject is created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Handles {
  pub telegram:  String,
  pub instagram: String,
  pub youtube:   String,
  pub vk:        String,
}

impl Handles {
  pub fn get(&self, platform: Platform) -> &str {
    match platform {
      Platform::Telegram => &self.telegram,
      Platform::Instagram => &self.instagram,
      Platform::Youtube => &self.youtube,
      Platform::Vk => &self.vk,
    }
  }

  pub fn all_empty(&self) -> bool {
    [&self.telegram, &self.instagram, &self.youtube, &self.vk]
      .iter()
      .all(|h| h.trim().is_empty())
  }
}

/// Input for creating a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubject {
  pub subject_id: i64,
  #[serde(flatten)]
  pub handles:    Handles,
}

impl NewSubject {
  pub fn new(subject_id: i64, handles: Handles) -> Self {
    Self { subject_id, handles }
  }

  /// Reject subjects that have no handle on any platform.
  pub fn validate(&self) -> Result<()> {
    if self.handles.all_empty() {
      return Err(Error::NoHandles);
    }
    Ok(())
  }
}

/// A partial update applied by the external update endpoint. `None` fields
/// are left unchanged; a handle set to `""` stops tracking that platform.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectPatch {
  pub telegram:  Option<String>,
  pub instagram: Option<String>,
  pub youtube:   Option<String>,
  pub vk:        Option<String>,
  pub is_active: Option<bool>,
}

impl SubjectPatch {
  pub fn handle(&self, platform: Platform) -> Option<&str> {
    match platform {
      Platform::Telegram => self.telegram.as_deref(),
      Platform::Instagram => self.instagram.as_deref(),
      Platform::Youtube => self.youtube.as_deref(),
      Platform::Vk => self.vk.as_deref(),
    }
  }

  /// Apply the patch to `subject`, trimming handles the same way creation
  /// does. A changed Telegram handle clears `has_subscribed` so the next
  /// sweep joins the new channel.
  pub fn apply(&self, subject: &mut Subject) {
    for platform in [
      Platform::Telegram,
      Platform::Instagram,
      Platform::Youtube,
      Platform::Vk,
    ] {
      if let Some(handle) = self.handle(platform).map(str::trim) {
        let account = subject.account_mut(platform);
        if account.handle != handle {
          account.handle = handle.to_owned();
          if platform == Platform::Telegram {
            subject.has_subscribed = false;
          }
        }
      }
    }
    if let Some(active) = self.is_active {
      subject.is_active = active;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn subject() -> Subject {
    Subject {
      internal_id:    1,
      subject_id:     42,
      telegram:       PlatformAccount::with_handle("medchannel"),
      instagram:      PlatformAccount::with_handle("dr.house"),
      youtube:        PlatformAccount::default(),
      vk:             PlatformAccount::default(),
      has_subscribed: true,
      is_active:      true,
    }
  }

  #[test]
  fn subject_without_handles_is_rejected() {
    let input = NewSubject::new(1, Handles { youtube: "  ".into(), ..Handles::default() });
    assert!(matches!(input.validate(), Err(Error::NoHandles)));
  }

  #[test]
  fn one_handle_is_enough() {
    let input = NewSubject::new(1, Handles { vk: "club1".into(), ..Handles::default() });
    assert!(input.validate().is_ok());
  }

  #[test]
  fn url_handles_are_malformed() {
    assert!(PlatformAccount::with_handle("https://instagram.com/dr").is_malformed());
    assert!(PlatformAccount::with_handle("HTTP://t.me/x").is_malformed());
    assert!(!PlatformAccount::with_handle("dr.house").is_malformed());
  }

  #[test]
  fn telegram_handle_change_resets_subscription() {
    let mut s = subject();
    SubjectPatch { telegram: Some("otherchannel".into()), ..Default::default() }.apply(&mut s);
    assert_eq!(s.telegram.handle, "otherchannel");
    assert!(!s.has_subscribed);
  }

  #[test]
  fn unchanged_telegram_handle_keeps_subscription() {
    let mut s = subject();
    SubjectPatch {
      telegram:  Some("medchannel".into()),
      instagram: Some(String::new()),
      is_active: Some(false),
      ..Default::default()
    }
    .apply(&mut s);
    assert!(s.has_subscribed);
    assert!(!s.instagram.is_tracked());
    assert!(!s.is_active);
  }

  #[test]
  fn clearing_every_handle_invalidates_the_subject() {
    let mut s = subject();
    assert!(s.validate().is_ok());
    SubjectPatch {
      telegram:  Some(String::new()),
      instagram: Some(" ".into()),
      ..Default::default()
    }
    .apply(&mut s);
    assert!(matches!(s.validate(), Err(Error::NoHandles)));
  }

  #[test]
  fn patched_handles_are_trimmed() {
    let mut s = subject();
    s.has_subscribed = true;
    SubjectPatch {
      telegram:  Some(" medchannel\n".into()),
      instagram: Some("  dr.cuddy ".into()),
      ..Default::default()
    }
    .apply(&mut s);
    assert_eq!(s.telegram.handle, "medchannel");
    assert_eq!(s.instagram.handle, "dr.cuddy");
    // Padding alone is not a new Telegram channel.
    assert!(s.has_subscribed);
  }
}
