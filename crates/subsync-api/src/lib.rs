//! JSON REST API for registering and maintaining tracked subjects.
//!
//! Exposes an axum [`Router`] backed by any
//! [`subsync_core::store::RosterStore`]. Auth and TLS are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", subsync_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod subjects;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use subsync_core::store::RosterStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RosterStore + 'static,
{
  Router::new()
    .route("/subjects", post(subjects::create::<S>))
    .route(
      "/subjects/{subject_id}",
      get(subjects::get_one::<S>).patch(subjects::update::<S>),
    )
    .with_state(store)
}
