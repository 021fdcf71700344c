//! [`Scheduler`] — runs every platform worker on a jittered interval.
//!
//! Workers of one tick run concurrently and independently: one platform
//! failing or panicking never stops the others. The next tick is scheduled
//! only once all of them have finished.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use rand::Rng as _;
use subsync_core::{
  Platform, adapter::PlatformAdapter, notify::Notifier, store::RosterStore,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{CallGate, Error, Result, SweepReport, SyncWorker};

/// A unit of work the scheduler can drive once per tick.
pub trait Sweep: Send + Sync {
  fn platform(&self) -> Platform;

  fn sweep<'a>(
    &'a self,
    cancel: &'a CancellationToken,
  ) -> Pin<Box<dyn Future<Output = Result<SweepReport>> + Send + 'a>>;
}

impl<S, A, G, N> Sweep for SyncWorker<S, A, G, N>
where
  S: RosterStore + 'static,
  A: PlatformAdapter + 'static,
  G: CallGate + 'static,
  N: Notifier + 'static,
{
  fn platform(&self) -> Platform { SyncWorker::platform(self) }

  fn sweep<'a>(
    &'a self,
    cancel: &'a CancellationToken,
  ) -> Pin<Box<dyn Future<Output = Result<SweepReport>> + Send + 'a>> {
    Box::pin(self.run_tick(cancel))
  }
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
  /// Shortest pause between two ticks.
  pub interval_min:  Duration,
  /// Longest pause between two ticks.
  pub interval_max:  Duration,
  /// Pause after a tick in which some worker failed.
  pub error_backoff: Duration,
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self {
      interval_min:  Duration::from_secs(2 * 24 * 3600),
      interval_max:  Duration::from_secs(3 * 24 * 3600),
      error_backoff: Duration::from_secs(30),
    }
  }
}

impl ScheduleConfig {
  pub fn validate(&self) -> Result<()> {
    if self.interval_min.is_zero() {
      return Err(Error::InvalidSchedule("interval_min must be positive".into()));
    }
    if self.interval_max < self.interval_min {
      return Err(Error::InvalidSchedule(
        "interval_max must not be shorter than interval_min".into(),
      ));
    }
    Ok(())
  }

  /// A uniformly random pause in `[interval_min, interval_max]`.
  pub fn next_interval(&self) -> Duration {
    let span = (self.interval_max - self.interval_min).as_millis() as u64;
    if span == 0 {
      return self.interval_min;
    }
    self.interval_min + Duration::from_millis(rand::thread_rng().gen_range(0..=span))
  }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

/// Result of one tick across all workers.
#[derive(Debug, Default)]
pub struct TickSummary {
  pub reports:  Vec<SweepReport>,
  /// Workers that returned an error or panicked.
  pub failures: usize,
}

pub struct Scheduler {
  workers: Vec<Arc<dyn Sweep>>,
  config:  ScheduleConfig,
}

impl Scheduler {
  pub fn new(config: ScheduleConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { workers: Vec::new(), config })
  }

  pub fn with_worker(mut self, worker: Arc<dyn Sweep>) -> Self {
    self.workers.push(worker);
    self
  }

  pub fn platforms(&self) -> Vec<Platform> {
    self.workers.iter().map(|w| w.platform()).collect()
  }

  /// Run every worker once, concurrently, and wait for all of them.
  pub async fn run_tick(&self, cancel: &CancellationToken) -> TickSummary {
    let mut set = JoinSet::new();
    for worker in &self.workers {
      let worker = worker.clone();
      let cancel = cancel.clone();
      set.spawn(async move {
        let platform = worker.platform();
        (platform, worker.sweep(&cancel).await)
      });
    }

    let mut summary = TickSummary::default();
    while let Some(joined) = set.join_next().await {
      match joined {
        Ok((_, Ok(report))) => {
          tracing::info!(
            platform = %report.platform,
            attempted = report.attempted,
            updated = report.updated,
            not_found = report.not_found,
            failed = report.failed,
            rate_limited = report.rate_limited,
            skipped = report.skipped,
            "sweep finished"
          );
          summary.reports.push(report);
        }
        Ok((platform, Err(e))) => {
          tracing::error!(%platform, error = %e, "sweep failed");
          summary.failures += 1;
        }
        Err(e) => {
          tracing::error!(error = %e, "sweep task panicked");
          summary.failures += 1;
        }
      }
    }
    summary
  }

  /// Tick until `cancel` fires.
  pub async fn run(&self, cancel: CancellationToken) {
    tracing::info!(platforms = ?self.platforms(), "scheduler started");
    while !cancel.is_cancelled() {
      let summary = self.run_tick(&cancel).await;

      let pause = if summary.failures > 0 {
        self.config.error_backoff
      } else {
        self.config.next_interval()
      };
      tracing::info!(secs = pause.as_secs(), "next tick scheduled");

      tokio::select! {
        _ = cancel.cancelled() => break,
        _ = tokio::time::sleep(pause) => {}
      }
    }
    tracing::info!("scheduler stopped");
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use tokio::time::Instant;

  use super::*;

  /// Counts its sweeps; fails or panics on demand.
  struct FakeSweep {
    platform: Platform,
    mode:     Mode,
    sweeps:   AtomicUsize,
    stop_at:  Option<(usize, CancellationToken)>,
    started:  Mutex<Vec<Instant>>,
  }

  #[derive(Clone, Copy)]
  enum Mode {
    Ok,
    Fail,
    Panic,
  }

  impl FakeSweep {
    fn new(platform: Platform, mode: Mode) -> Self {
      Self {
        platform,
        mode,
        sweeps: AtomicUsize::new(0),
        stop_at: None,
        started: Mutex::new(Vec::new()),
      }
    }

    fn stopping_after(mut self, n: usize, cancel: &CancellationToken) -> Self {
      self.stop_at = Some((n, cancel.clone()));
      self
    }

    fn sweeps(&self) -> usize { self.sweeps.load(Ordering::SeqCst) }
  }

  impl Sweep for FakeSweep {
    fn platform(&self) -> Platform { self.platform }

    fn sweep<'a>(
      &'a self,
      _cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<SweepReport>> + Send + 'a>> {
      Box::pin(async move {
        self.started.lock().unwrap().push(Instant::now());
        let n = self.sweeps.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((stop, cancel)) = &self.stop_at {
          if n >= *stop {
            cancel.cancel();
          }
        }
        match self.mode {
          Mode::Ok => Ok(SweepReport::new(self.platform)),
          Mode::Fail => Err(Error::InvalidSchedule("boom".into())),
          Mode::Panic => panic!("worker exploded"),
        }
      })
    }
  }

  fn config(min: u64, max: u64) -> ScheduleConfig {
    ScheduleConfig {
      interval_min:  Duration::from_secs(min),
      interval_max:  Duration::from_secs(max),
      error_backoff: Duration::from_secs(30),
    }
  }

  #[test]
  fn default_schedule_is_two_to_three_days() {
    let c = ScheduleConfig::default();
    assert!(c.validate().is_ok());
    for _ in 0..100 {
      let pause = c.next_interval();
      assert!(pause >= Duration::from_secs(2 * 86_400));
      assert!(pause <= Duration::from_secs(3 * 86_400));
    }
  }

  #[test]
  fn inverted_interval_is_rejected() {
    assert!(matches!(Scheduler::new(config(10, 5)), Err(Error::InvalidSchedule(_))));
    assert!(matches!(Scheduler::new(config(0, 5)), Err(Error::InvalidSchedule(_))));
    assert_eq!(config(7, 7).next_interval(), Duration::from_secs(7));
  }

  #[tokio::test]
  async fn failing_worker_does_not_stop_the_others() {
    let ok = Arc::new(FakeSweep::new(Platform::Telegram, Mode::Ok));
    let failing = Arc::new(FakeSweep::new(Platform::Youtube, Mode::Fail));
    let panicking = Arc::new(FakeSweep::new(Platform::Vk, Mode::Panic));
    let scheduler = Scheduler::new(config(60, 120))
      .unwrap()
      .with_worker(ok.clone())
      .with_worker(failing.clone())
      .with_worker(panicking.clone());

    let summary = scheduler.run_tick(&CancellationToken::new()).await;

    assert_eq!(summary.failures, 2);
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].platform, Platform::Telegram);
    assert_eq!(ok.sweeps() + failing.sweeps() + panicking.sweeps(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn ticks_are_spaced_by_the_interval() {
    let cancel = CancellationToken::new();
    let worker = Arc::new(FakeSweep::new(Platform::Telegram, Mode::Ok).stopping_after(3, &cancel));
    let scheduler = Scheduler::new(config(3600, 7200)).unwrap().with_worker(worker.clone());

    scheduler.run(cancel).await;

    assert_eq!(worker.sweeps(), 3);
    let started = worker.started.lock().unwrap().clone();
    for pair in started.windows(2) {
      let gap = pair[1] - pair[0];
      assert!(gap >= Duration::from_secs(3600));
      assert!(gap <= Duration::from_secs(7200));
    }
  }

  #[tokio::test(start_paused = true)]
  async fn failed_tick_retries_after_back_off() {
    let cancel = CancellationToken::new();
    let worker = Arc::new(FakeSweep::new(Platform::Vk, Mode::Fail).stopping_after(2, &cancel));
    let scheduler = Scheduler::new(config(3600, 7200)).unwrap().with_worker(worker.clone());

    scheduler.run(cancel).await;

    let started = worker.started.lock().unwrap().clone();
    assert_eq!(started.len(), 2);
    let gap = started[1] - started[0];
    assert!(gap >= Duration::from_secs(30));
    assert!(gap < Duration::from_secs(31));
  }

  #[tokio::test]
  async fn cancelled_scheduler_never_ticks() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let worker = Arc::new(FakeSweep::new(Platform::Instagram, Mode::Ok));
    let scheduler = Scheduler::new(config(1, 2)).unwrap().with_worker(worker.clone());

    scheduler.run(cancel).await;
    assert_eq!(worker.sweeps(), 0);
  }
}
