//! Platform adapter traits.
//!
//! One adapter per platform translates a handle into a [`FetchOutcome`].
//! Transport details live in `subsync-clients`.

use std::future::Future;

use crate::{
  Platform,
  platform::{AuthContext, FetchOutcome},
};

pub trait PlatformAdapter: Send + Sync {
  fn platform(&self) -> Platform;

  /// Ask the platform for the follower count behind `handle`.
  fn subscriber_count<'a>(
    &'a self,
    handle: &'a str,
    auth: &'a AuthContext,
  ) -> impl Future<Output = FetchOutcome> + Send + 'a;

  /// Whether reads require the polling identity to have joined the channel
  /// first (Telegram).
  fn requires_membership(&self) -> bool { false }

  /// Join the channel behind `handle`. Returns `true` on success.
  fn join_channel<'a>(
    &'a self,
    _handle: &'a str,
  ) -> impl Future<Output = bool> + Send + 'a {
    async { true }
  }
}

/// Exchanges a short-lived token for a long-lived one (Instagram).
pub trait TokenExchange: Send + Sync {
  /// Returns `None` when the platform refuses the exchange.
  fn exchange_token<'a>(
    &'a self,
    short_lived_token: &'a str,
  ) -> impl Future<Output = Option<String>> + Send + 'a;
}
