//! Telegram adapter.
//!
//! Talks to a Bot-API-compatible HTTP gateway. Member counts are read with
//! `getChat` + `getChatMemberCount`; channel membership is requested with
//! `joinChat`, which gateways backed by a user account expose. A gateway that
//! does not support joining simply reports the join as failed, which never
//! blocks the read.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use subsync_core::{
  Platform,
  adapter::PlatformAdapter,
  platform::{AuthContext, FetchOutcome},
};

use crate::{
  Result,
  http::{build_client, fetch},
};

/// Back-off applied when a 429 carries no `retry_after`.
const DEFAULT_FLOOD_WAIT: Duration = Duration::from_secs(30);

/// Connection settings for the Telegram gateway.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
  pub api_base:  String,
  pub bot_token: String,
}

/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct TelegramClient {
  client: Client,
  config: TelegramConfig,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BotResponse<T> {
  pub ok:          bool,
  pub result:      Option<T>,
  pub error_code:  Option<u16>,
  pub description: Option<String>,
  pub parameters:  Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
  pub retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
  #[serde(rename = "type")]
  pub kind: String,
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Map a failed Bot API response to an outcome.
///
/// | `error_code` | Outcome |
/// |---|---|
/// | 429 | `RateLimited(parameters.retry_after)` |
/// | 400 | `NotFound` (unknown username, "chat not found") |
/// | anything else | `Transient` |
pub fn classify_error<T>(resp: &BotResponse<T>) -> FetchOutcome {
  let description = resp.description.as_deref().unwrap_or("no description");
  match resp.error_code {
    Some(429) => FetchOutcome::RateLimited {
      retry_after: resp
        .parameters
        .as_ref()
        .and_then(|p| p.retry_after)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_FLOOD_WAIT),
    },
    Some(400) => FetchOutcome::NotFound,
    Some(code) => FetchOutcome::transient(format!("telegram error {code}: {description}")),
    None => FetchOutcome::transient(format!("telegram error: {description}")),
  }
}

/// Individual users have no public subscriber count.
pub fn is_broadcast(chat: &Chat) -> bool { chat.kind != "private" }

/// `@username` for bare usernames; numeric chat ids and `@`-prefixed names
/// pass through.
pub fn chat_ref(handle: &str) -> String {
  let handle = handle.trim();
  if handle.starts_with('@') || handle.parse::<i64>().is_ok() {
    handle.to_owned()
  } else {
    format!("@{handle}")
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

impl TelegramClient {
  pub fn new(config: TelegramConfig) -> Result<Self> {
    Ok(Self { client: build_client()?, config })
  }

  fn url(&self, method: &str) -> String {
    format!(
      "{}/bot{}/{}",
      self.config.api_base.trim_end_matches('/'),
      self.config.bot_token,
      method
    )
  }

  /// Call `method` for `handle`, returning the decoded `result` or the
  /// classified failure.
  async fn call<T: DeserializeOwned>(
    &self,
    method: &str,
    handle: &str,
  ) -> Result<T, FetchOutcome> {
    let req = self
      .client
      .get(self.url(method))
      .query(&[("chat_id", chat_ref(handle))]);

    let fetched = fetch(req).await.map_err(FetchOutcome::Transient)?;
    let resp: BotResponse<T> = serde_json::from_str(&fetched.body).map_err(|e| {
      FetchOutcome::transient(format!(
        "{method} → HTTP {}: undecodable body: {e}",
        fetched.status
      ))
    })?;

    match resp {
      BotResponse { ok: true, result: Some(result), .. } => Ok(result),
      failed => Err(classify_error(&failed)),
    }
  }
}

impl PlatformAdapter for TelegramClient {
  fn platform(&self) -> Platform { Platform::Telegram }

  async fn subscriber_count(&self, handle: &str, _auth: &AuthContext) -> FetchOutcome {
    let chat: Chat = match self.call("getChat", handle).await {
      Ok(chat) => chat,
      Err(outcome) => return outcome,
    };
    if !is_broadcast(&chat) {
      tracing::debug!(handle, "telegram handle is a private user, not a channel");
      return FetchOutcome::NotFound;
    }

    match self.call::<u64>("getChatMemberCount", handle).await {
      Ok(count) => FetchOutcome::Count(count),
      Err(outcome) => outcome,
    }
  }

  fn requires_membership(&self) -> bool { true }

  async fn join_channel(&self, handle: &str) -> bool {
    match self.call::<bool>("joinChat", handle).await {
      Ok(joined) => joined,
      Err(outcome) => {
        tracing::debug!(handle, ?outcome, "telegram join failed");
        false
      }
    }
  }
}
