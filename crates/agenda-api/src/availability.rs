//! `GET /availability?provider_id=&date=`: the availability report for one
//! provider on one date.

use std::sync::Arc;

use agenda_core::{availability::AvailabilityReport, service::Scheduler, store::NoveltyStore};
use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// A provider and a calendar day. Both are required.
#[derive(Debug, Deserialize)]
pub struct PairParams {
  pub provider_id: Uuid,
  pub date:        NaiveDate,
}

pub async fn handler<S: NoveltyStore>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Query(params): Query<PairParams>,
) -> Result<Json<AvailabilityReport>, ApiError> {
  let report = scheduler
    .get_availability(params.provider_id, params.date)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(report))
}
