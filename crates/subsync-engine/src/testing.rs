//! In-memory fakes shared by the engine's tests.

use std::{
  collections::HashMap,
  convert::Infallible,
  sync::Mutex,
};

use chrono::{DateTime, Utc};
use subsync_core::{
  Platform,
  adapter::{PlatformAdapter, TokenExchange},
  notify::Notifier,
  platform::{AuthContext, FetchOutcome},
  quota::QuotaWindow,
  store::QuotaStore,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// ─── Quota ───────────────────────────────────────────────────────────────────

pub struct MemoryQuota {
  window: Mutex<QuotaWindow>,
}

impl MemoryQuota {
  pub fn new(window: QuotaWindow) -> Self { Self { window: Mutex::new(window) } }

  pub fn snapshot(&self) -> QuotaWindow { self.window.lock().unwrap().clone() }
}

impl QuotaStore for MemoryQuota {
  type Error = Infallible;

  async fn get_quota(&self) -> Result<QuotaWindow, Infallible> { Ok(self.snapshot()) }

  async fn set_token(&self, long_lived_token: String) -> Result<(), Infallible> {
    let mut w = self.window.lock().unwrap();
    w.long_lived_token = long_lived_token;
    w.token_active = true;
    Ok(())
  }

  async fn disable_token(&self) -> Result<(), Infallible> {
    self.window.lock().unwrap().token_active = false;
    Ok(())
  }

  async fn increment_filled(&self) -> Result<(), Infallible> {
    self.window.lock().unwrap().filled_count += 1;
    Ok(())
  }

  async fn reset_window(&self, started_at: DateTime<Utc>) -> Result<(), Infallible> {
    let mut w = self.window.lock().unwrap();
    w.filled_count = 0;
    w.window_started_at = started_at;
    Ok(())
  }
}

pub struct FixedExchange {
  token: Option<String>,
}

impl FixedExchange {
  pub fn new(token: Option<&str>) -> Self { Self { token: token.map(str::to_owned) } }
}

impl TokenExchange for FixedExchange {
  async fn exchange_token(&self, _short_lived_token: &str) -> Option<String> { self.token.clone() }
}

// ─── Notifier ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
  errors:    Mutex<Vec<(String, String)>>,
  not_found: Mutex<Vec<(i64, Platform, String)>>,
  /// Cancelled on the first error alert.
  on_error:  Option<CancellationToken>,
}

impl RecordingNotifier {
  pub fn cancelling(token: &CancellationToken) -> Self {
    Self { on_error: Some(token.clone()), ..Self::default() }
  }

  pub fn errors(&self) -> Vec<(String, String)> { self.errors.lock().unwrap().clone() }

  pub fn not_found(&self) -> Vec<(i64, Platform, String)> {
    self.not_found.lock().unwrap().clone()
  }
}

impl Notifier for RecordingNotifier {
  async fn alert_error(&self, message: &str, origin: &str) {
    self
      .errors
      .lock()
      .unwrap()
      .push((message.to_owned(), origin.to_owned()));
    if let Some(token) = &self.on_error {
      token.cancel();
    }
  }

  async fn alert_subject_not_found(&self, subject_id: i64, platform: Platform, handle: &str) {
    self
      .not_found
      .lock()
      .unwrap()
      .push((subject_id, platform, handle.to_owned()));
  }
}

// ─── Adapter ─────────────────────────────────────────────────────────────────

/// Returns a scripted outcome per handle and records every call.
pub struct ScriptedAdapter {
  platform:   Platform,
  outcomes:   HashMap<String, FetchOutcome>,
  fallback:   FetchOutcome,
  membership: bool,
  join_ok:    bool,
  calls:      Mutex<Vec<(String, AuthContext, Instant)>>,
  joins:      Mutex<Vec<String>>,
}

impl ScriptedAdapter {
  pub fn new(platform: Platform, fallback: FetchOutcome) -> Self {
    Self {
      platform,
      outcomes: HashMap::new(),
      fallback,
      membership: false,
      join_ok: true,
      calls: Mutex::new(Vec::new()),
      joins: Mutex::new(Vec::new()),
    }
  }

  pub fn with(mut self, handle: &str, outcome: FetchOutcome) -> Self {
    self.outcomes.insert(handle.to_owned(), outcome);
    self
  }

  pub fn with_membership(mut self, join_ok: bool) -> Self {
    self.membership = true;
    self.join_ok = join_ok;
    self
  }

  pub fn calls(&self) -> Vec<(String, AuthContext, Instant)> { self.calls.lock().unwrap().clone() }

  pub fn handles_called(&self) -> Vec<String> {
    self.calls().into_iter().map(|(h, _, _)| h).collect()
  }

  pub fn joins(&self) -> Vec<String> { self.joins.lock().unwrap().clone() }
}

impl PlatformAdapter for ScriptedAdapter {
  fn platform(&self) -> Platform { self.platform }

  async fn subscriber_count(&self, handle: &str, auth: &AuthContext) -> FetchOutcome {
    self
      .calls
      .lock()
      .unwrap()
      .push((handle.to_owned(), auth.clone(), Instant::now()));
    self
      .outcomes
      .get(handle)
      .cloned()
      .unwrap_or_else(|| self.fallback.clone())
  }

  fn requires_membership(&self) -> bool { self.membership }

  async fn join_channel(&self, handle: &str) -> bool {
    self.joins.lock().unwrap().push(handle.to_owned());
    self.join_ok
  }
}
