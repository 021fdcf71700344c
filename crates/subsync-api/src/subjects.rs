//! Handlers for `/subjects` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/subjects` | Body: `{"subject_id":7,"telegram":"chan"}`; 400 without handles, 409 on duplicate |
//! | `GET`   | `/subjects/{subject_id}` | 404 if not found |
//! | `PATCH` | `/subjects/{subject_id}` | Body: any of the handles and `is_active` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use subsync_core::{
  store::RosterStore,
  subject::{NewSubject, Subject, SubjectPatch},
};

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /subjects`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore,
{
  body
    .validate()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let subject = store
    .create_subject(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(subject)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /subjects/{subject_id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(subject_id): Path<i64>,
) -> Result<Json<Subject>, ApiError>
where
  S: RosterStore,
{
  let subject = store
    .get_subject(subject_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {subject_id} not found")))?;
  Ok(Json(subject))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /subjects/{subject_id}`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(subject_id): Path<i64>,
  Json(patch): Json<SubjectPatch>,
) -> Result<Json<Subject>, ApiError>
where
  S: RosterStore,
{
  let subject = store
    .update_subject(subject_id, patch)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {subject_id} not found")))?;
  Ok(Json(subject))
}
