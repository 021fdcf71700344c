//! Outbound alerting.

use std::future::Future;

use crate::Platform;

/// A fire-and-forget alert sink.
///
/// Implementations swallow (and log) their own delivery failures: an alert
/// that cannot be sent must never interrupt a sync.
pub trait Notifier: Send + Sync {
  /// Report an unexpected failure. `origin` names the component that hit it.
  fn alert_error<'a>(
    &'a self,
    message: &'a str,
    origin: &'a str,
  ) -> impl Future<Output = ()> + Send + 'a;

  /// Report that a subject's handle does not resolve on `platform`.
  fn alert_subject_not_found<'a>(
    &'a self,
    subject_id: i64,
    platform: Platform,
    handle: &'a str,
  ) -> impl Future<Output = ()> + Send + 'a;
}
