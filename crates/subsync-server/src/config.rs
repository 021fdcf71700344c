//! Runtime configuration, deserialised from `config.toml` layered with
//! `SUBSYNC_*` environment variables.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use subsync_clients::{
  InstagramConfig, SalebotConfig, TelegramConfig, VkConfig, YoutubeConfig,
};
use subsync_engine::ScheduleConfig;
use thiserror::Error;

/// Prefix of environment overrides, e.g. `SUBSYNC_TELEGRAM__BOT_TOKEN`.
pub const ENV_PREFIX: &str = "SUBSYNC";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to load configuration: {0}")]
  Load(#[from] config::ConfigError),

  #[error("invalid configuration: {0}")]
  Invalid(String),
}

// ─── Top level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub sync:       SyncConfig,
  pub telegram:   TelegramSection,
  pub instagram:  InstagramSection,
  pub youtube:    YoutubeSection,
  pub vk:         VkSection,
  /// Alerts go to the log only when absent.
  pub salebot:    Option<SalebotSection>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".into(),
      port:       8080,
      store_path: PathBuf::from("~/.local/share/subsync/subsync.db"),
      sync:       SyncConfig::default(),
      telegram:   TelegramSection::default(),
      instagram:  InstagramSection::default(),
      youtube:    YoutubeSection::default(),
      vk:         VkSection::default(),
      salebot:    None,
    }
  }
}

impl ServerConfig {
  /// Load `path`, if it exists, layered with `SUBSYNC_*` overrides.
  pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(environment())
      .build()?;
    let cfg: ServerConfig = settings.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.sync.validate()?;

    let missing = |section: &str, field: &str| {
      ConfigError::Invalid(format!("{section} is enabled but {field} is empty"))
    };
    if self.telegram.enabled && self.telegram.bot_token.is_empty() {
      return Err(missing("telegram", "bot_token"));
    }
    if self.instagram.enabled && self.instagram.business_account_id.is_empty() {
      return Err(missing("instagram", "business_account_id"));
    }
    if self.youtube.enabled && self.youtube.api_key.is_empty() {
      return Err(missing("youtube", "api_key"));
    }
    if self.vk.enabled && self.vk.api_key.is_empty() {
      return Err(missing("vk", "api_key"));
    }
    if let Some(salebot) = &self.salebot
      && salebot.api_key.is_empty()
    {
      return Err(missing("salebot", "api_key"));
    }
    Ok(())
  }
}

fn environment() -> config::Environment {
  config::Environment::with_prefix(ENV_PREFIX)
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

// ─── Sync ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Subjects fetched per batch.
  pub batch_size:         usize,
  pub batches_per_tick:   usize,
  pub interval_min_secs:  u64,
  pub interval_max_secs:  u64,
  /// Pause after a tick in which a worker failed.
  pub error_backoff_secs: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      batch_size:         2,
      batches_per_tick:   1,
      interval_min_secs:  2 * 24 * 3600,
      interval_max_secs:  3 * 24 * 3600,
      error_backoff_secs: 30,
    }
  }
}

impl SyncConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.batch_size == 0 {
      return Err(ConfigError::Invalid("sync.batch_size must be at least 1".into()));
    }
    if self.batches_per_tick == 0 {
      return Err(ConfigError::Invalid("sync.batches_per_tick must be at least 1".into()));
    }
    self
      .schedule()
      .validate()
      .map_err(|e| ConfigError::Invalid(e.to_string()))
  }

  pub fn schedule(&self) -> ScheduleConfig {
    ScheduleConfig {
      interval_min:  Duration::from_secs(self.interval_min_secs),
      interval_max:  Duration::from_secs(self.interval_max_secs),
      error_backoff: Duration::from_secs(self.error_backoff_secs),
    }
  }
}

// ─── Platforms ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
  pub enabled:   bool,
  pub api_base:  String,
  pub bot_token: String,
}

impl Default for TelegramSection {
  fn default() -> Self {
    Self {
      enabled:   false,
      api_base:  "https://api.telegram.org".into(),
      bot_token: String::new(),
    }
  }
}

impl TelegramSection {
  pub fn client_config(&self) -> TelegramConfig {
    TelegramConfig { api_base: self.api_base.clone(), bot_token: self.bot_token.clone() }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstagramSection {
  pub enabled:             bool,
  pub graph_base:          String,
  pub auth_base:           String,
  pub business_account_id: String,
  pub app_secret:          String,
  /// Requests allowed per hourly window.
  pub capacity_limit:      u32,
  /// Seeded into the quota row at startup; a new value forces a token
  /// exchange on the next tick.
  pub short_lived_token:   Option<String>,
}

impl Default for InstagramSection {
  fn default() -> Self {
    Self {
      enabled:             false,
      graph_base:          "https://graph.facebook.com/v21.0".into(),
      auth_base:           "https://graph.instagram.com".into(),
      business_account_id: String::new(),
      app_secret:          String::new(),
      capacity_limit:      subsync_core::quota::DEFAULT_CAPACITY,
      short_lived_token:   None,
    }
  }
}

impl InstagramSection {
  pub fn client_config(&self) -> InstagramConfig {
    InstagramConfig {
      graph_base:          self.graph_base.clone(),
      auth_base:           self.auth_base.clone(),
      business_account_id: self.business_account_id.clone(),
      app_secret:          self.app_secret.clone(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YoutubeSection {
  pub enabled:  bool,
  pub api_base: String,
  pub api_key:  String,
}

impl Default for YoutubeSection {
  fn default() -> Self {
    Self {
      enabled:  false,
      api_base: "https://www.googleapis.com/youtube/v3".into(),
      api_key:  String::new(),
    }
  }
}

impl YoutubeSection {
  pub fn client_config(&self) -> YoutubeConfig {
    YoutubeConfig { api_base: self.api_base.clone(), api_key: self.api_key.clone() }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VkSection {
  pub enabled:     bool,
  pub api_base:    String,
  pub api_key:     String,
  pub api_version: String,
}

impl Default for VkSection {
  fn default() -> Self {
    Self {
      enabled:     false,
      api_base:    "https://api.vk.com/method".into(),
      api_key:     String::new(),
      api_version: "5.199".into(),
    }
  }
}

impl VkSection {
  pub fn client_config(&self) -> VkConfig {
    VkConfig {
      api_base:    self.api_base.clone(),
      api_key:     self.api_key.clone(),
      api_version: self.api_version.clone(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SalebotSection {
  pub api_key:       String,
  /// Chat that receives the alerts.
  pub admin_chat_id: String,
  #[serde(default)]
  pub url:           Option<String>,
}

impl SalebotSection {
  pub fn client_config(&self) -> SalebotConfig {
    SalebotConfig {
      api_key:       self.api_key.clone(),
      admin_chat_id: self.admin_chat_id.clone(),
      url:           self.url.clone(),
    }
  }
}
