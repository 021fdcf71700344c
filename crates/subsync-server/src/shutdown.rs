//! Graceful shutdown coordinator.
//!
//! The first SIGINT or SIGTERM cancels a [`CancellationToken`] so workers stop
//! between subjects and the API drains its connections. A second signal
//! force-exits.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub fn install_signal_handler() -> CancellationToken {
  let token = CancellationToken::new();
  let (tx, rx) = mpsc::unbounded_channel();

  tokio::spawn(listen(tx));
  tokio::spawn(relay(rx, token.clone(), || {
    tracing::warn!("forced exit");
    std::process::exit(130);
  }));

  token
}

/// Forward every OS shutdown signal into `tx` until the relay goes away.
async fn listen(tx: mpsc::UnboundedSender<()>) {
  #[cfg(unix)]
  let mut sigterm = match tokio::signal::unix::signal(
    tokio::signal::unix::SignalKind::terminate(),
  ) {
    Ok(s) => Some(s),
    Err(e) => {
      tracing::warn!(error = %e, "failed to register SIGTERM handler");
      None
    }
  };

  loop {
    #[cfg(unix)]
    {
      let term = async {
        match sigterm.as_mut() {
          Some(s) => {
            s.recv().await;
          }
          None => std::future::pending::<()>().await,
        }
      };
      tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term => {}
      }
    }

    #[cfg(not(unix))]
    {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl+C");
        return;
      }
    }

    if tx.send(()).is_err() {
      return;
    }
  }
}

/// First signal cancels `token`; the second runs `force_exit`.
async fn relay(
  mut signals: mpsc::UnboundedReceiver<()>,
  token:       CancellationToken,
  force_exit:  impl FnOnce(),
) {
  if signals.recv().await.is_none() {
    return;
  }
  tracing::info!("shutdown requested, finishing the current subject");
  token.cancel();

  if signals.recv().await.is_some() {
    force_exit();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  };

  use super::*;

  #[tokio::test]
  async fn token_starts_uncancelled() {
    let token = install_signal_handler();
    tokio::task::yield_now().await;
    assert!(!token.is_cancelled());
  }

  #[tokio::test]
  async fn first_signal_cancels_second_forces_exit() {
    let (tx, rx) = mpsc::unbounded_channel();
    let token = CancellationToken::new();
    let forced = Arc::new(AtomicBool::new(false));

    let flag = forced.clone();
    let relay = tokio::spawn(relay(rx, token.clone(), move || {
      flag.store(true, Ordering::SeqCst);
    }));

    tx.send(()).unwrap();
    token.cancelled().await;
    assert!(!forced.load(Ordering::SeqCst));

    tx.send(()).unwrap();
    relay.await.unwrap();
    assert!(forced.load(Ordering::SeqCst));
  }

  #[tokio::test]
  async fn closed_signal_source_leaves_token_alone() {
    let (tx, rx) = mpsc::unbounded_channel::<()>();
    let token = CancellationToken::new();
    drop(tx);

    relay(rx, token.clone(), || panic!("no signal was sent")).await;
    assert!(!token.is_cancelled());
  }
}
