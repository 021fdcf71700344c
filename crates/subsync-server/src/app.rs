//! Wiring: turns a validated [`ServerConfig`] into a notifier and a
//! [`Scheduler`] with one worker per enabled platform.

use std::sync::Arc;

use subsync_clients::{
  AlertSink, InstagramClient, LogNotifier, SalebotNotifier, TelegramClient, VkClient,
  YoutubeClient,
};
use subsync_engine::{QuotaTracker, Scheduler, SyncWorker, Ungated};
use subsync_store_sqlite::SqliteStore;

use crate::config::ServerConfig;

pub fn build_notifier(cfg: &ServerConfig) -> anyhow::Result<AlertSink> {
  Ok(match &cfg.salebot {
    Some(salebot) => AlertSink::Salebot(SalebotNotifier::new(salebot.client_config())?),
    None => {
      tracing::info!("salebot not configured, alerts go to the log only");
      AlertSink::Log(LogNotifier)
    }
  })
}

pub fn build_scheduler(
  cfg:      &ServerConfig,
  store:    Arc<SqliteStore>,
  notifier: Arc<AlertSink>,
) -> anyhow::Result<Scheduler> {
  let batch_size = cfg.sync.batch_size;
  let batches    = cfg.sync.batches_per_tick;
  let mut scheduler = Scheduler::new(cfg.sync.schedule())?;

  if cfg.telegram.enabled {
    let adapter = Arc::new(TelegramClient::new(cfg.telegram.client_config())?);
    scheduler = scheduler.with_worker(Arc::new(SyncWorker::new(
      store.clone(),
      adapter,
      Ungated,
      notifier.clone(),
      batch_size,
      batches,
    )));
  }

  if cfg.instagram.enabled {
    let client = Arc::new(InstagramClient::new(cfg.instagram.client_config())?);
    let gate = QuotaTracker::new(store.clone(), client.clone(), notifier.clone());
    scheduler = scheduler.with_worker(Arc::new(SyncWorker::new(
      store.clone(),
      client,
      gate,
      notifier.clone(),
      batch_size,
      batches,
    )));
  }

  if cfg.youtube.enabled {
    let adapter = Arc::new(YoutubeClient::new(cfg.youtube.client_config())?);
    scheduler = scheduler.with_worker(Arc::new(SyncWorker::new(
      store.clone(),
      adapter,
      Ungated,
      notifier.clone(),
      batch_size,
      batches,
    )));
  }

  if cfg.vk.enabled {
    let adapter = Arc::new(VkClient::new(cfg.vk.client_config())?);
    scheduler = scheduler.with_worker(Arc::new(SyncWorker::new(
      store,
      adapter,
      Ungated,
      notifier,
      batch_size,
      batches,
    )));
  }

  if scheduler.platforms().is_empty() {
    tracing::warn!("no platform enabled, the scheduler has nothing to do");
  }
  Ok(scheduler)
}

#[cfg(test)]
mod tests {
  use subsync_core::Platform;

  use super::*;

  async fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().await.unwrap())
  }

  #[tokio::test]
  async fn only_enabled_platforms_get_workers() {
    let mut cfg = ServerConfig::default();
    cfg.telegram.enabled = true;
    cfg.telegram.bot_token = "123:abc".into();
    cfg.vk.enabled = true;
    cfg.vk.api_key = "vk-key".into();

    let notifier = Arc::new(build_notifier(&cfg).unwrap());
    let scheduler = build_scheduler(&cfg, store().await, notifier).unwrap();
    assert_eq!(scheduler.platforms(), vec![Platform::Telegram, Platform::Vk]);
  }

  #[tokio::test]
  async fn instagram_worker_is_gated() {
    let mut cfg = ServerConfig::default();
    cfg.instagram.enabled = true;
    cfg.instagram.business_account_id = "1784".into();

    let notifier = Arc::new(build_notifier(&cfg).unwrap());
    let scheduler = build_scheduler(&cfg, store().await, notifier).unwrap();
    assert_eq!(scheduler.platforms(), vec![Platform::Instagram]);

    // No token was ever configured, so the tick is refused before any call.
    let summary = scheduler.run_tick(&Default::default()).await;
    assert_eq!(summary.failures, 0);
    assert!(summary.reports[0].skipped);
  }

  #[test]
  fn salebot_section_selects_salebot() {
    let mut cfg = ServerConfig::default();
    assert!(matches!(build_notifier(&cfg).unwrap(), AlertSink::Log(_)));

    cfg.salebot = Some(crate::config::SalebotSection {
      api_key:       "key".into(),
      admin_chat_id: "1".into(),
      url:           None,
    });
    assert!(matches!(build_notifier(&cfg).unwrap(), AlertSink::Salebot(_)));
  }
}
