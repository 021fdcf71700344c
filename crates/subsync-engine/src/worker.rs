//! [`SyncWorker`] — drains batches for one platform.
//!
//! Subjects are processed strictly in order. Whatever the platform answers,
//! the cursor is committed past the subject before the worker moves on, so a
//! handle that always fails can never stall the sweep.

use std::{sync::Arc, time::Duration};

use subsync_core::{
  Platform,
  adapter::PlatformAdapter,
  notify::Notifier,
  platform::{AuthContext, FetchOutcome},
  store::RosterStore,
  subject::Subject,
};
use tokio_util::sync::CancellationToken;

use crate::{BatchSelector, CallGate, Error, Result};

/// Per-tick counters for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
  pub platform:     Platform,
  /// Platform reads performed.
  pub attempted:    usize,
  pub updated:      usize,
  pub not_found:    usize,
  pub failed:       usize,
  pub rate_limited: usize,
  /// The gate refused the whole tick.
  pub skipped:      bool,
}

impl SweepReport {
  pub fn new(platform: Platform) -> Self {
    Self {
      platform,
      attempted: 0,
      updated: 0,
      not_found: 0,
      failed: 0,
      rate_limited: 0,
      skipped: false,
    }
  }
}

/// What the worker does after finishing one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
  Next,
  /// Pause the whole worker, then fetch a fresh batch.
  BackOff(Duration),
  /// The gate refused the call; stop this tick.
  Halt,
}

pub struct SyncWorker<S, A, G, N> {
  platform:         Platform,
  store:            Arc<S>,
  selector:         BatchSelector<S>,
  adapter:          Arc<A>,
  gate:             G,
  notifier:         Arc<N>,
  batches_per_tick: usize,
}

impl<S, A, G, N> SyncWorker<S, A, G, N>
where
  S: RosterStore,
  A: PlatformAdapter,
  G: CallGate,
  N: Notifier,
{
  pub fn new(
    store:            Arc<S>,
    adapter:          Arc<A>,
    gate:             G,
    notifier:         Arc<N>,
    batch_size:       usize,
    batches_per_tick: usize,
  ) -> Self {
    Self {
      platform: adapter.platform(),
      selector: BatchSelector::new(store.clone(), batch_size),
      store,
      adapter,
      gate,
      notifier,
      batches_per_tick: batches_per_tick.max(1),
    }
  }

  pub fn platform(&self) -> Platform { self.platform }

  fn origin(&self) -> String { format!("sync::{}", self.platform) }

  /// Run one tick: up to `batches_per_tick` batches, stopping early on
  /// cancellation, an empty roster or a closed gate.
  pub async fn run_tick(&self, cancel: &CancellationToken) -> Result<SweepReport> {
    let mut report = SweepReport::new(self.platform);

    let Some(auth) = self.gate.open().await? else {
      tracing::info!(platform = %self.platform, "calls not admitted, skipping tick");
      report.skipped = true;
      return Ok(report);
    };

    'batches: for _ in 0..self.batches_per_tick {
      if cancel.is_cancelled() {
        break;
      }

      let batch = self.selector.next_batch(self.platform).await?;
      if batch.is_empty() {
        tracing::debug!(platform = %self.platform, "no eligible subjects");
        break;
      }
      tracing::info!(
        platform = %self.platform,
        size = batch.subjects.len(),
        wrapped = batch.wrapped,
        "processing batch"
      );

      for subject in &batch.subjects {
        if cancel.is_cancelled() {
          break 'batches;
        }

        match self.process(subject, &auth, &mut report).await? {
          Step::Next => {}
          Step::Halt => break 'batches,
          Step::BackOff(wait) => {
            tracing::warn!(
              platform = %self.platform,
              secs = wait.as_secs(),
              "rate limited, suspending worker"
            );
            tokio::select! {
              _ = cancel.cancelled() => break 'batches,
              _ = tokio::time::sleep(wait) => {}
            }
            continue 'batches;
          }
        }
      }
    }

    Ok(report)
  }

  async fn process(
    &self,
    subject: &Subject,
    auth:    &AuthContext,
    report:  &mut SweepReport,
  ) -> Result<Step> {
    let platform = self.platform;
    let handle   = subject.handle(platform);

    if subject.account(platform).is_malformed() {
      tracing::debug!(subject_id = subject.subject_id, handle, "handle looks like a URL");
      self.commit(subject).await?;
      report.not_found += 1;
      self
        .notifier
        .alert_subject_not_found(subject.subject_id, platform, handle)
        .await;
      return Ok(Step::Next);
    }

    if !self.gate.before_call().await? {
      return Ok(Step::Halt);
    }

    if self.adapter.requires_membership() && !subject.has_subscribed {
      if self.adapter.join_channel(handle).await {
        self
          .store
          .set_has_subscribed(subject.subject_id, true)
          .await
          .map_err(Error::store)?;
      } else {
        tracing::debug!(subject_id = subject.subject_id, handle, "join failed, reading anyway");
      }
    }

    let outcome = self.adapter.subscriber_count(handle, auth).await;
    self.gate.after_call(&outcome).await?;
    report.attempted += 1;

    match outcome {
      FetchOutcome::Count(count) => {
        let stored = self
          .store
          .update_count(subject.subject_id, platform, count)
          .await;
        if let Err(e) = stored {
          // A count the store refuses must not pin the cursor on this subject.
          tracing::warn!(
            subject_id = subject.subject_id,
            handle,
            count,
            error = %e,
            "count not stored"
          );
          self.commit(subject).await?;
          report.failed += 1;
          self
            .notifier
            .alert_error(
              &format!(
                "could not store {} count {count} for subject {}: {e}",
                platform.display_name(),
                subject.subject_id
              ),
              &self.origin(),
            )
            .await;
          return Ok(Step::Next);
        }
        self.commit(subject).await?;
        report.updated += 1;
        tracing::debug!(subject_id = subject.subject_id, count, "count updated");
        if count == 0 {
          // Upstream also reports zero for profiles it could not resolve.
          self
            .notifier
            .alert_subject_not_found(subject.subject_id, platform, handle)
            .await;
        }
        Ok(Step::Next)
      }
      FetchOutcome::NotFound => {
        self.commit(subject).await?;
        report.not_found += 1;
        self
          .notifier
          .alert_subject_not_found(subject.subject_id, platform, handle)
          .await;
        Ok(Step::Next)
      }
      FetchOutcome::RateLimited { retry_after } => {
        self.commit(subject).await?;
        report.rate_limited += 1;
        self
          .notifier
          .alert_error(
            &format!(
              "{} rate limit hit on subject {}, backing off for {}s",
              platform.display_name(),
              subject.subject_id,
              retry_after.as_secs()
            ),
            &self.origin(),
          )
          .await;
        Ok(Step::BackOff(retry_after))
      }
      FetchOutcome::Transient(cause) | FetchOutcome::TokenInvalid(cause) => {
        self.commit(subject).await?;
        report.failed += 1;
        tracing::warn!(subject_id = subject.subject_id, handle, %cause, "fetch failed");
        self.notifier.alert_error(&cause, &self.origin()).await;
        Ok(Step::Next)
      }
    }
  }

  async fn commit(&self, subject: &Subject) -> Result<()> {
    self.selector.commit(self.platform, subject).await
  }
}
