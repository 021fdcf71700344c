//! VK API adapter (`groups.getMembers`).

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use subsync_core::{
  Platform,
  adapter::PlatformAdapter,
  platform::{AuthContext, FetchOutcome},
};

use crate::{
  Result,
  http::{Fetched, build_client, fetch},
};

#[derive(Debug, Clone)]
pub struct VkConfig {
  /// e.g. `https://api.vk.com/method`
  pub api_base:    String,
  pub api_key:     String,
  pub api_version: String,
}

#[derive(Clone)]
pub struct VkClient {
  client: Client,
  config: VkConfig,
}

#[derive(Debug, Deserialize)]
struct VkEnvelope {
  response: Option<MembersResponse>,
  error:    Option<VkError>,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
  count: u64,
}

#[derive(Debug, Deserialize)]
struct VkError {
  error_code: i64,
  #[serde(default)]
  error_msg:  String,
}

/// Map a VK API error code to an outcome.
///
/// | Code | Meaning | Outcome |
/// |---|---|---|
/// | 5 | authorization failed | `TokenInvalid` |
/// | 6 | too many requests per second | `RateLimited(1s)` |
/// | 9 | flood control | `RateLimited(60s)` |
/// | 15, 100, 125, 203 | no such / closed group | `NotFound` |
/// | anything else | | `Transient` |
pub fn classify_error(code: i64, message: &str) -> FetchOutcome {
  match code {
    5 => FetchOutcome::token_invalid(format!("vk error 5: {message}")),
    6 => FetchOutcome::RateLimited { retry_after: Duration::from_secs(1) },
    9 => FetchOutcome::RateLimited { retry_after: Duration::from_secs(60) },
    15 | 100 | 125 | 203 => FetchOutcome::NotFound,
    code => FetchOutcome::transient(format!("vk error {code}: {message}")),
  }
}

pub fn classify(resp: &Fetched) -> FetchOutcome {
  if resp.status != 200 {
    return FetchOutcome::transient(format!("vk: HTTP {}", resp.status));
  }
  match serde_json::from_str::<VkEnvelope>(&resp.body) {
    Ok(VkEnvelope { error: Some(err), .. }) => classify_error(err.error_code, &err.error_msg),
    Ok(VkEnvelope { response: Some(members), .. }) => FetchOutcome::Count(members.count),
    Ok(_) => FetchOutcome::transient("vk: empty response"),
    Err(e) => FetchOutcome::transient(format!("vk: undecodable body: {e}")),
  }
}

impl VkClient {
  pub fn new(config: VkConfig) -> Result<Self> {
    Ok(Self { client: build_client()?, config })
  }
}

impl PlatformAdapter for VkClient {
  fn platform(&self) -> Platform { Platform::Vk }

  async fn subscriber_count(&self, handle: &str, _auth: &AuthContext) -> FetchOutcome {
    let url = format!("{}/groups.getMembers", self.config.api_base.trim_end_matches('/'));
    let req = self.client.get(url).query(&[
      ("group_id", handle.trim()),
      ("access_token", self.config.api_key.as_str()),
      ("v", self.config.api_version.as_str()),
    ]);

    match fetch(req).await {
      Ok(resp) => classify(&resp),
      Err(cause) => FetchOutcome::transient(format!("vk: {cause}")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn resp(body: &str) -> Fetched {
    Fetched { status: 200, retry_after: None, body: body.to_owned() }
  }

  #[test]
  fn member_count() {
    let r = resp(r#"{"response":{"count":3120,"items":[1,2,3]}}"#);
    assert_eq!(classify(&r), FetchOutcome::Count(3120));
  }

  #[test]
  fn error_table() {
    assert!(matches!(classify_error(5, "User authorization failed"), FetchOutcome::TokenInvalid(_)));
    assert_eq!(classify_error(6, ""), FetchOutcome::RateLimited {
      retry_after: Duration::from_secs(1),
    });
    assert_eq!(classify_error(125, "Invalid group id"), FetchOutcome::NotFound);
    assert_eq!(classify_error(100, ""), FetchOutcome::NotFound);
    assert!(matches!(classify_error(10, "Internal server error"), FetchOutcome::Transient(_)));
  }

  #[test]
  fn error_envelope_wins() {
    let r = resp(r#"{"error":{"error_code":125,"error_msg":"Invalid group id","request_params":[]}}"#);
    assert_eq!(classify(&r), FetchOutcome::NotFound);
  }

  #[test]
  fn non_200_is_transient() {
    let r = Fetched { status: 502, retry_after: None, body: String::new() };
    assert!(matches!(classify(&r), FetchOutcome::Transient(m) if m.contains("502")));
  }
}
