//! Per-platform call admission.

use std::future::Future;

use subsync_core::platform::{AuthContext, FetchOutcome};

use crate::Result;

/// Decides whether a worker may call its platform, and with what
/// credentials.
pub trait CallGate: Send + Sync {
  /// Called once at the start of a tick. `None` skips the tick entirely.
  fn open(&self) -> impl Future<Output = Result<Option<AuthContext>>> + Send + '_;

  /// Called before each platform read. `false` ends the tick without
  /// attempting the current subject.
  fn before_call(&self) -> impl Future<Output = Result<bool>> + Send + '_;

  /// Called after each platform read with its outcome.
  fn after_call<'a>(
    &'a self,
    outcome: &'a FetchOutcome,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}

/// Admits every call with the adapter's own credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ungated;

impl CallGate for Ungated {
  async fn open(&self) -> Result<Option<AuthContext>> { Ok(Some(AuthContext::Ambient)) }

  async fn before_call(&self) -> Result<bool> { Ok(true) }

  async fn after_call(&self, _outcome: &FetchOutcome) -> Result<()> { Ok(()) }
}
