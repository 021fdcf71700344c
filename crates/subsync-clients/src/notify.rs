//! Alert sinks: Salebot (the admin chat) or the log.

use reqwest::Client;
use subsync_core::{Platform, notify::Notifier};
use tokio::task::JoinHandle;

use crate::{
  Result,
  http::{build_client, fetch},
};

/// Default Salebot callback endpoint; `{api_key}` is substituted.
const SALEBOT_URL: &str = "https://chatter.salebot.pro/api/{api_key}/callback";

// ─── Log ─────────────────────────────────────────────────────────────────────

/// Writes alerts to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  async fn alert_error(&self, message: &str, origin: &str) {
    tracing::error!(origin, "{message}");
  }

  async fn alert_subject_not_found(&self, subject_id: i64, platform: Platform, handle: &str) {
    tracing::warn!(subject_id, %platform, handle, "subject not found on platform");
  }
}

// ─── Salebot ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SalebotConfig {
  pub api_key:       String,
  pub admin_chat_id: String,
  /// Overrides the callback URL; mostly useful for tests and staging.
  pub url:           Option<String>,
}

/// Posts alerts to a Salebot callback, which relays them to the admin chat.
#[derive(Clone)]
pub struct SalebotNotifier {
  client: Client,
  url:    String,
  config: SalebotConfig,
}

impl SalebotNotifier {
  pub fn new(config: SalebotConfig) -> Result<Self> {
    let url = config
      .url
      .clone()
      .unwrap_or_else(|| SALEBOT_URL.replace("{api_key}", &config.api_key));
    Ok(Self { client: build_client()?, url, config })
  }

  /// Post `form` in the background; delivery failures are logged and
  /// dropped. The caller never waits on Salebot.
  fn post(&self, form: Vec<(&'static str, String)>) -> JoinHandle<()> {
    let req = self.client.post(&self.url).form(&form);
    tokio::spawn(async move {
      match fetch(req).await {
        Ok(resp) if (200..300).contains(&resp.status) => {}
        Ok(resp) => tracing::error!(status = resp.status, "salebot rejected alert"),
        Err(cause) => tracing::error!(%cause, "failed to deliver alert to salebot"),
      }
    })
  }
}

impl Notifier for SalebotNotifier {
  async fn alert_error(&self, message: &str, origin: &str) {
    tracing::error!(origin, "{message}");
    self.post(vec![
      ("error_place", origin.to_owned()),
      ("error_message", message.to_owned()),
      ("message", "subscribers_error".to_owned()),
      ("client_id", self.config.admin_chat_id.clone()),
    ]);
  }

  async fn alert_subject_not_found(&self, subject_id: i64, platform: Platform, handle: &str) {
    tracing::warn!(subject_id, %platform, handle, "subject not found on platform");
    self.post(vec![
      ("doctor_id", subject_id.to_string()),
      ("social_media", platform.display_name().to_owned()),
      ("channel_name", handle.to_owned()),
      ("message", "doctor_not_found".to_owned()),
      ("client_id", self.config.admin_chat_id.clone()),
    ]);
  }
}

// ─── Runtime choice ──────────────────────────────────────────────────────────

/// The notifier picked from configuration at startup.
#[derive(Clone)]
pub enum AlertSink {
  Salebot(SalebotNotifier),
  Log(LogNotifier),
}

impl Notifier for AlertSink {
  async fn alert_error(&self, message: &str, origin: &str) {
    match self {
      AlertSink::Salebot(n) => n.alert_error(message, origin).await,
      AlertSink::Log(n) => n.alert_error(message, origin).await,
    }
  }

  async fn alert_subject_not_found(&self, subject_id: i64, platform: Platform, handle: &str) {
    match self {
      AlertSink::Salebot(n) => n.alert_subject_not_found(subject_id, platform, handle).await,
      AlertSink::Log(n) => n.alert_subject_not_found(subject_id, platform, handle).await,
    }
  }
}
