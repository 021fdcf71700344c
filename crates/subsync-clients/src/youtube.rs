//! YouTube Data API adapter.

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

const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct YoutubeConfig {
  /// e.g. `https://www.googleapis.com/youtube/v3`
  pub api_base: String,
  pub api_key:  String,
}

#[derive(Clone)]
pub struct YoutubeClient {
  client: Client,
  config: YoutubeConfig,
}

#[derive(Debug, Deserialize)]
struct ChannelList {
  #[serde(default)]
  items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
  statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
  /// Sent as a decimal string; absent when the channel hides it.
  subscriber_count: Option<String>,
}

/// Map a `channels.list` response to an outcome.
///
/// | Status | Outcome |
/// |---|---|
/// | 200, no items | `NotFound` |
/// | 200 | `Count(subscriberCount)`, hidden count → `Count(0)` |
/// | 404 | `NotFound` |
/// | 429 | `RateLimited(Retry-After)` |
/// | anything else (incl. 403 quotaExceeded) | `Transient` |
pub fn classify(resp: &Fetched) -> FetchOutcome {
  match resp.status {
    200 => {
      let list = match serde_json::from_str::<ChannelList>(&resp.body) {
        Ok(list) => list,
        Err(e) => return FetchOutcome::transient(format!("youtube: undecodable body: {e}")),
      };
      match list.items.into_iter().next() {
        None => FetchOutcome::NotFound,
        Some(item) => FetchOutcome::Count(
          item
            .statistics
            .and_then(|s| s.subscriber_count)
            .and_then(|c| c.parse().ok())
            .unwrap_or(0),
        ),
      }
    }
    404 => FetchOutcome::NotFound,
    429 => FetchOutcome::RateLimited {
      retry_after: resp
        .retry_after
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER),
    },
    status => FetchOutcome::transient(format!("youtube: HTTP {status}")),
  }
}

impl YoutubeClient {
  pub fn new(config: YoutubeConfig) -> Result<Self> {
    Ok(Self { client: build_client()?, config })
  }
}

impl PlatformAdapter for YoutubeClient {
  fn platform(&self) -> Platform { Platform::Youtube }

  async fn subscriber_count(&self, handle: &str, _auth: &AuthContext) -> FetchOutcome {
    let url = format!("{}/channels", self.config.api_base.trim_end_matches('/'));
    let req = self.client.get(url).query(&[
      ("part", "statistics"),
      ("forHandle", handle.trim()),
      ("key", self.config.api_key.as_str()),
    ]);

    match fetch(req).await {
      Ok(resp) => classify(&resp),
      Err(cause) => FetchOutcome::transient(format!("youtube: {cause}")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn resp(status: u16, body: &str) -> Fetched {
    Fetched { status, retry_after: None, body: body.to_owned() }
  }

  #[test]
  fn channel_with_statistics() {
    let r = resp(200, r#"{"items":[{"id":"UC1","statistics":{"subscriberCount":"48100","hiddenSubscriberCount":false}}]}"#);
    assert_eq!(classify(&r), FetchOutcome::Count(48_100));
  }

  #[test]
  fn hidden_count_is_zero() {
    let r = resp(200, r#"{"items":[{"id":"UC1","statistics":{"hiddenSubscriberCount":true}}]}"#);
    assert_eq!(classify(&r), FetchOutcome::Count(0));
  }

  #[test]
  fn unknown_handle_is_not_found() {
    assert_eq!(classify(&resp(200, r#"{"kind":"youtube#channelListResponse"}"#)), FetchOutcome::NotFound);
    assert_eq!(classify(&resp(404, "")), FetchOutcome::NotFound);
  }

  #[test]
  fn throttling_honours_retry_after() {
    let mut r = resp(429, "");
    r.retry_after = Some(12);
    assert_eq!(classify(&r), FetchOutcome::RateLimited { retry_after: Duration::from_secs(12) });
    assert_eq!(classify(&resp(429, "")), FetchOutcome::RateLimited {
      retry_after: DEFAULT_RETRY_AFTER,
    });
  }

  #[test]
  fn quota_exceeded_is_transient() {
    assert!(matches!(classify(&resp(403, "")), FetchOutcome::Transient(_)));
  }
}
