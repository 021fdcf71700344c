//! Shared HTTP plumbing.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, header::RETRY_AFTER};

use crate::Result;

/// Per-request timeout for platform calls. A hung call blocks only its own
/// platform's worker, and only until this fires.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_client() -> Result<Client> {
  Ok(
    Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .user_agent(concat!("subsync/", env!("CARGO_PKG_VERSION")))
      .build()?,
  )
}

/// The parts of a response the classifiers look at.
#[derive(Debug, Clone)]
pub struct Fetched {
  pub status:      u16,
  /// `Retry-After` in seconds, when the server sent one.
  pub retry_after: Option<u64>,
  pub body:        String,
}

/// Send `req` and read the body. Transport failures come back as a short,
/// URL-free description so credentials in query strings never reach logs.
pub async fn fetch(req: RequestBuilder) -> Result<Fetched, String> {
  let resp = req.send().await.map_err(|e| e.without_url().to_string())?;

  let status = resp.status().as_u16();
  let retry_after = resp
    .headers()
    .get(RETRY_AFTER)
    .and_then(|v| v.to_str().ok())
    .and_then(|s| s.trim().parse().ok());
  let body = resp.text().await.map_err(|e| e.without_url().to_string())?;

  Ok(Fetched { status, retry_after, body })
}
