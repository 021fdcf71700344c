//! Instagram Graph API adapter.
//!
//! Follower counts come from the business-discovery edge of our own business
//! account. Every call needs a long-lived access token, which is obtained by
//! exchanging a short-lived one (see [`TokenExchange`]).

use reqwest::Client;
use serde::Deserialize;
use subsync_core::{
  Platform,
  adapter::{PlatformAdapter, TokenExchange},
  platform::{AuthContext, FetchOutcome},
};

use crate::{
  Result,
  http::{Fetched, build_client, fetch},
};

/// Graph API error code for an expired or revoked access token.
const OAUTH_TOKEN_ERROR: i64 = 190;

/// Connection settings for the Instagram Graph API.
#[derive(Debug, Clone)]
pub struct InstagramConfig {
  /// e.g. `https://graph.facebook.com/v21.0`
  pub graph_base:          String,
  /// e.g. `https://graph.instagram.com`
  pub auth_base:           String,
  pub business_account_id: String,
  pub app_secret:          String,
}

#[derive(Clone)]
pub struct InstagramClient {
  client: Client,
  config: InstagramConfig,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
  business_discovery: Option<DiscoveredProfile>,
}

#[derive(Debug, Deserialize)]
struct DiscoveredProfile {
  followers_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
  error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
  code:    Option<i64>,
  message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: Option<String>,
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Map a business-discovery response to an outcome.
///
/// | Status | Outcome |
/// |---|---|
/// | 200 | `Count(followers_count)`, missing count → `Count(0)` |
/// | 400, Graph error 190 | `TokenInvalid` |
/// | 400 | `NotFound` |
/// | 401 | `TokenInvalid` |
/// | anything else | `Transient` |
///
/// A zero count is passed through untouched: upstream uses it both for
/// genuinely empty profiles and for profiles it could not resolve.
pub fn classify(resp: &Fetched) -> FetchOutcome {
  match resp.status {
    200 => match serde_json::from_str::<DiscoveryResponse>(&resp.body) {
      Ok(parsed) => FetchOutcome::Count(
        parsed
          .business_discovery
          .and_then(|p| p.followers_count)
          .unwrap_or(0),
      ),
      Err(e) => FetchOutcome::transient(format!("instagram: undecodable body: {e}")),
    },
    400 => match graph_error(&resp.body) {
      Some(err) if err.code == Some(OAUTH_TOKEN_ERROR) => {
        FetchOutcome::token_invalid(error_message(&err))
      }
      _ => FetchOutcome::NotFound,
    },
    401 => FetchOutcome::token_invalid(
      graph_error(&resp.body)
        .map(|e| error_message(&e))
        .unwrap_or_else(|| "instagram: unauthorized".to_owned()),
    ),
    status => FetchOutcome::transient(format!("instagram: HTTP {status}")),
  }
}

/// Extract the long-lived token from an exchange response.
pub fn parse_exchange(resp: &Fetched) -> Option<String> {
  if resp.status != 200 {
    return None;
  }
  serde_json::from_str::<TokenResponse>(&resp.body)
    .ok()
    .and_then(|t| t.access_token)
    .filter(|t| !t.is_empty())
}

fn graph_error(body: &str) -> Option<GraphError> {
  serde_json::from_str::<GraphErrorEnvelope>(body)
    .ok()
    .map(|e| e.error)
}

fn error_message(err: &GraphError) -> String {
  format!(
    "instagram error {}: {}",
    err.code.unwrap_or_default(),
    err.message.as_deref().unwrap_or("no message")
  )
}

// ─── Client ──────────────────────────────────────────────────────────────────

impl InstagramClient {
  pub fn new(config: InstagramConfig) -> Result<Self> {
    Ok(Self { client: build_client()?, config })
  }
}

impl PlatformAdapter for InstagramClient {
  fn platform(&self) -> Platform { Platform::Instagram }

  async fn subscriber_count(&self, handle: &str, auth: &AuthContext) -> FetchOutcome {
    let Some(token) = auth.token() else {
      return FetchOutcome::token_invalid("instagram: no access token");
    };

    let url = format!(
      "{}/{}",
      self.config.graph_base.trim_end_matches('/'),
      self.config.business_account_id
    );
    let fields = format!("business_discovery.username({}){{followers_count}}", handle.trim());
    let req = self
      .client
      .get(url)
      .query(&[("fields", fields.as_str()), ("access_token", token)]);

    match fetch(req).await {
      Ok(resp) => classify(&resp),
      Err(cause) => FetchOutcome::transient(format!("instagram: {cause}")),
    }
  }
}

impl TokenExchange for InstagramClient {
  async fn exchange_token(&self, short_lived_token: &str) -> Option<String> {
    let url = format!("{}/access_token", self.config.auth_base.trim_end_matches('/'));
    let req = self.client.get(url).query(&[
      ("grant_type", "ig_exchange_token"),
      ("client_secret", self.config.app_secret.as_str()),
      ("access_token", short_lived_token),
    ]);

    match fetch(req).await {
      Ok(resp) => {
        let token = parse_exchange(&resp);
        if token.is_none() {
          tracing::warn!(status = resp.status, "instagram token exchange refused");
        }
        token
      }
      Err(cause) => {
        tracing::warn!(%cause, "instagram token exchange failed");
        None
      }
    }
  }
}
