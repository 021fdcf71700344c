//! subsync server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! roster, serves the subject API over HTTP and runs the sync scheduler until
//! SIGINT or SIGTERM.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use subsync_server::{ServerConfig, app, shutdown};
use subsync_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Multi-platform subscriber sync")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run a single sync tick and exit without serving the API.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load {}", cli.config.display()))?;

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  store
    .configure_quota(cfg.instagram.capacity_limit, cfg.instagram.short_lived_token.clone())
    .await
    .context("failed to seed the instagram quota")?;
  let store = Arc::new(store);

  let notifier = Arc::new(app::build_notifier(&cfg)?);
  let scheduler = app::build_scheduler(&cfg, store.clone(), notifier)?;
  let cancel = shutdown::install_signal_handler();

  if cli.once {
    let summary = scheduler.run_tick(&cancel).await;
    tracing::info!(
      workers = summary.reports.len(),
      failures = summary.failures,
      "single tick finished"
    );
    return Ok(());
  }

  let app = Router::new()
    .merge(subsync_api::api_router(store))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let sync_cancel = cancel.clone();
  let sync = tokio::spawn(async move { scheduler.run(sync_cancel).await });

  let api_cancel = cancel.clone();
  let served = axum::serve(listener, app)
    .with_graceful_shutdown(async move { api_cancel.cancelled().await })
    .await
    .context("server error");

  // The API can also stop on its own; take the scheduler down with it.
  cancel.cancel();
  sync.await.context("scheduler task failed")?;
  served
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
