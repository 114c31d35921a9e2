//! Handlers for `/novelties` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/novelties` | Optional `?provider_id=&date_from=&date_to=&state=` |
//! | `POST` | `/novelties` | Body: a [`NewNovelty`]; 201 on success |
//! | `GET`  | `/novelties/today` | Novelties dated today |
//! | `GET`  | `/novelties/stats` | Same filters as the list |
//! | `GET`  | `/novelties/:id` | Detail view; 404 if not found |
//! | `PUT`  | `/novelties/:id` | Body: a [`NewNovelty`] |
//! | `POST` | `/novelties/:id/void` | Body: `{"reason":"..."}` |

use std::sync::Arc;

use agenda_core::{
  novelty::{NewNovelty, Novelty},
  service::{NoveltyDetail, Scheduler},
  store::{NoveltyFilter, NoveltyStats, NoveltyStore},
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /novelties[?provider_id=&date_from=&date_to=&state=]`
pub async fn list<S: NoveltyStore>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Query(filter): Query<NoveltyFilter>,
) -> Result<Json<Vec<Novelty>>, ApiError> {
  let novelties = scheduler
    .list_novelties(&filter)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(novelties))
}

/// `GET /novelties/today`
pub async fn today<S: NoveltyStore>(
  State(scheduler): State<Arc<Scheduler<S>>>,
) -> Result<Json<Vec<Novelty>>, ApiError> {
  let novelties = scheduler.list_today().await.map_err(ApiError::from_store)?;
  Ok(Json(novelties))
}

/// `GET /novelties/stats[?provider_id=&date_from=&date_to=&state=]`
pub async fn stats<S: NoveltyStore>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Query(filter): Query<NoveltyFilter>,
) -> Result<Json<NoveltyStats>, ApiError> {
  let stats = scheduler.get_stats(&filter).await.map_err(ApiError::from_store)?;
  Ok(Json(stats))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /novelties`
pub async fn create<S: NoveltyStore>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Json(body): Json<NewNovelty>,
) -> Result<impl IntoResponse, ApiError> {
  let novelty = scheduler
    .create_novelty(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(novelty)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /novelties/:id`
pub async fn get_one<S: NoveltyStore>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<NoveltyDetail>, ApiError> {
  let detail = scheduler.get_novelty(id).await.map_err(ApiError::from_store)?;
  Ok(Json(detail))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /novelties/:id`
pub async fn update_one<S: NoveltyStore>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewNovelty>,
) -> Result<Json<Novelty>, ApiError> {
  let novelty = scheduler
    .update_novelty(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(novelty))
}

// ─── Void ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VoidBody {
  /// A missing reason is reported as a validation error, not a parse error.
  #[serde(default)]
  pub reason: String,
}

/// `POST /novelties/:id/void` with body `{"reason":"..."}`
pub async fn void_one<S: NoveltyStore>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<VoidBody>,
) -> Result<Json<Novelty>, ApiError> {
  let novelty = scheduler
    .void_novelty(id, body.reason)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(novelty))
}
