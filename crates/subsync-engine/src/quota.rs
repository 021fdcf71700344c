//! [`QuotaTracker`] — the Instagram quota window and token lifecycle.
//!
//! ```text
//!   NoToken ──exchange ok──▶ Active ──filled ≥ limit − 5──▶ CapacityReached
//!      ▲                      │  ▲                               │
//!      │               exchange  └────── window rolls over ──────┘
//!      │               fails / token
//!      │               rejected
//!      │                      ▼
//!      └──── next tick ──── Disabled
//! ```
//!
//! Every read attempt costs one unit of quota whatever its outcome, and so
//! does a failed token exchange.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, Utc};
use subsync_core::{
  adapter::TokenExchange,
  notify::Notifier,
  platform::{AuthContext, FetchOutcome},
  quota::{QuotaState, QuotaWindow},
  store::QuotaStore,
};

use crate::{CallGate, Error, Result};

const ORIGIN: &str = "quota_tracker";

pub struct QuotaTracker<Q, X, N> {
  store:    Arc<Q>,
  exchange: Arc<X>,
  notifier: Arc<N>,
  /// Set once calls must stop for the rest of the current tick.
  closed:   AtomicBool,
}

impl<Q, X, N> QuotaTracker<Q, X, N>
where
  Q: QuotaStore,
  X: TokenExchange,
  N: Notifier,
{
  pub fn new(store: Arc<Q>, exchange: Arc<X>, notifier: Arc<N>) -> Self {
    Self { store, exchange, notifier, closed: AtomicBool::new(false) }
  }

  /// Load the window, rolling it over first if an hour has passed.
  pub async fn window(&self, now: DateTime<Utc>) -> Result<QuotaWindow> {
    let window = self.store.get_quota().await.map_err(Error::store)?;
    if !window.is_expired(now) {
      return Ok(window);
    }

    tracing::debug!(filled = window.filled_count, "instagram quota window rolled over");
    self.store.reset_window(now).await.map_err(Error::store)?;
    self.store.get_quota().await.map_err(Error::store)
  }

  pub async fn state(&self, now: DateTime<Utc>) -> Result<QuotaState> {
    Ok(self.window(now).await?.state())
  }

  /// Start-of-tick admission at `now`.
  pub async fn open_at(&self, now: DateTime<Utc>) -> Result<Option<AuthContext>> {
    self.closed.store(false, Ordering::SeqCst);
    let window = self.window(now).await?;

    if window.capacity_reached() {
      self.close_for_capacity(&window).await;
      return Ok(None);
    }

    if window.token_active && !window.long_lived_token.is_empty() {
      return Ok(Some(AuthContext::Token(window.long_lived_token)));
    }

    if window.short_lived_token.is_empty() {
      self.closed.store(true, Ordering::SeqCst);
      self
        .notifier
        .alert_error("no Instagram short-lived token configured, cannot issue a token", ORIGIN)
        .await;
      return Ok(None);
    }

    match self.exchange.exchange_token(&window.short_lived_token).await {
      Some(long_lived) => {
        tracing::info!("issued a new instagram long-lived token");
        self.store.set_token(long_lived.clone()).await.map_err(Error::store)?;
        Ok(Some(AuthContext::Token(long_lived)))
      }
      None => {
        self.closed.store(true, Ordering::SeqCst);
        self.store.disable_token().await.map_err(Error::store)?;
        self.store.increment_filled().await.map_err(Error::store)?;
        self
          .notifier
          .alert_error("Instagram token exchange failed or the token is invalid", ORIGIN)
          .await;
        Ok(None)
      }
    }
  }

  /// Per-call admission at `now`.
  pub async fn before_call_at(&self, now: DateTime<Utc>) -> Result<bool> {
    if self.closed.load(Ordering::SeqCst) {
      return Ok(false);
    }

    let window = self.window(now).await?;
    if window.capacity_reached() {
      self.close_for_capacity(&window).await;
      return Ok(false);
    }
    if !window.token_active {
      self.closed.store(true, Ordering::SeqCst);
      return Ok(false);
    }
    Ok(true)
  }

  async fn close_for_capacity(&self, window: &QuotaWindow) {
    self.closed.store(true, Ordering::SeqCst);
    tracing::warn!(
      filled = window.filled_count,
      limit = window.capacity_limit,
      "instagram hourly request capacity reached"
    );
    self
      .notifier
      .alert_error("Instagram hourly request capacity reached", ORIGIN)
      .await;
  }
}

impl<Q, X, N> CallGate for QuotaTracker<Q, X, N>
where
  Q: QuotaStore,
  X: TokenExchange,
  N: Notifier,
{
  async fn open(&self) -> Result<Option<AuthContext>> { self.open_at(Utc::now()).await }

  async fn before_call(&self) -> Result<bool> { self.before_call_at(Utc::now()).await }

  async fn after_call(&self, outcome: &FetchOutcome) -> Result<()> {
    self.store.increment_filled().await.map_err(Error::store)?;
    if let FetchOutcome::TokenInvalid(_) = outcome {
      self.closed.store(true, Ordering::SeqCst);
      self.store.disable_token().await.map_err(Error::store)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::testing::{FixedExchange, MemoryQuota, RecordingNotifier};

  type Tracker = QuotaTracker<MemoryQuota, FixedExchange, RecordingNotifier>;

  fn tracker(window: QuotaWindow, exchange: Option<&str>) -> (Tracker, Arc<MemoryQuota>, Arc<RecordingNotifier>) {
    let store = Arc::new(MemoryQuota::new(window));
    let notifier = Arc::new(RecordingNotifier::default());
    let tracker = QuotaTracker::new(
      store.clone(),
      Arc::new(FixedExchange::new(exchange)),
      notifier.clone(),
    );
    (tracker, store, notifier)
  }

  fn active(filled: u32, started: DateTime<Utc>) -> QuotaWindow {
    QuotaWindow {
      capacity_limit:    200,
      filled_count:      filled,
      window_started_at: started,
      long_lived_token:  "long".into(),
      short_lived_token: "short".into(),
      token_active:      true,
    }
  }

  #[tokio::test]
  async fn active_token_is_handed_out() {
    let now = Utc::now();
    let (t, store, notifier) = tracker(active(10, now), None);
    assert_eq!(t.open_at(now).await.unwrap(), Some(AuthContext::Token("long".into())));
    assert!(t.before_call_at(now).await.unwrap());
    assert_eq!(store.snapshot().filled_count, 10);
    assert!(notifier.errors().is_empty());
  }

  #[tokio::test]
  async fn capacity_reached_denies_without_spending_quota() {
    let now = Utc::now();
    let (t, store, notifier) = tracker(active(199, now), None);

    assert_eq!(t.state(now).await.unwrap(), QuotaState::CapacityReached);
    assert_eq!(t.open_at(now).await.unwrap(), None);
    assert!(!t.before_call_at(now).await.unwrap());
    assert_eq!(store.snapshot().filled_count, 199);
    assert_eq!(notifier.errors().len(), 1);
  }

  #[tokio::test]
  async fn window_resets_only_after_an_hour() {
    let start = Utc::now();
    let (t, store, _) = tracker(active(250, start), None);

    assert_eq!(t.open_at(start + Duration::minutes(59)).await.unwrap(), None);
    assert_eq!(store.snapshot().filled_count, 250);

    let later = start + Duration::hours(1);
    assert!(t.open_at(later).await.unwrap().is_some());
    let window = store.snapshot();
    assert_eq!(window.filled_count, 0);
    assert_eq!(window.window_started_at, later);
  }

  #[tokio::test]
  async fn every_read_costs_one_unit() {
    let now = Utc::now();
    let (t, store, _) = tracker(active(0, now), None);
    t.after_call(&FetchOutcome::Count(5)).await.unwrap();
    t.after_call(&FetchOutcome::NotFound).await.unwrap();
    t.after_call(&FetchOutcome::transient("boom")).await.unwrap();
    assert_eq!(store.snapshot().filled_count, 3);
  }

  #[tokio::test]
  async fn capacity_guard_engages_mid_tick() {
    let now = Utc::now();
    let (t, _store, notifier) = tracker(active(193, now), None);
    assert!(t.open_at(now).await.unwrap().is_some());

    assert!(t.before_call_at(now).await.unwrap());
    t.after_call(&FetchOutcome::Count(1)).await.unwrap();
    assert!(t.before_call_at(now).await.unwrap());
    t.after_call(&FetchOutcome::Count(1)).await.unwrap();

    // 195 + 5 ≥ 200
    assert!(!t.before_call_at(now).await.unwrap());
    assert!(!t.before_call_at(now).await.unwrap());
    assert_eq!(notifier.errors().len(), 1);
  }

  #[tokio::test]
  async fn missing_token_is_exchanged() {
    let now = Utc::now();
    let mut window = active(0, now);
    window.token_active = false;
    window.long_lived_token.clear();
    let (t, store, _) = tracker(window, Some("fresh"));

    assert_eq!(t.state(now).await.unwrap(), QuotaState::NoToken);
    assert_eq!(t.open_at(now).await.unwrap(), Some(AuthContext::Token("fresh".into())));
    let window = store.snapshot();
    assert!(window.token_active);
    assert_eq!(window.long_lived_token, "fresh");
    assert_eq!(window.filled_count, 0);
  }

  #[tokio::test]
  async fn failed_exchange_disables_and_costs_quota() {
    let now = Utc::now();
    let mut window = active(4, now);
    window.token_active = false;
    let (t, store, notifier) = tracker(window, None);

    assert_eq!(t.open_at(now).await.unwrap(), None);
    let window = store.snapshot();
    assert!(!window.token_active);
    assert_eq!(window.filled_count, 5);
    assert_eq!(notifier.errors().len(), 1);
    assert_eq!(t.state(now).await.unwrap(), QuotaState::Disabled);
  }

  #[tokio::test]
  async fn rejected_token_closes_the_gate() {
    let now = Utc::now();
    let (t, store, _) = tracker(active(0, now), None);
    assert!(t.open_at(now).await.unwrap().is_some());

    t.after_call(&FetchOutcome::token_invalid("expired")).await.unwrap();
    assert!(!t.before_call_at(now).await.unwrap());
    let window = store.snapshot();
    assert!(!window.token_active);
    assert_eq!(window.filled_count, 1);
  }
}
