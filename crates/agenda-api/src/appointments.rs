//! Handlers for `/appointments` endpoints.
//!
//! Appointments are booked elsewhere; these endpoints let the booking side
//! hand them over and read back the states the reconciliation left them in.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/appointments` | Required `?provider_id=&date=` |
//! | `GET`  | `/appointments/:id` | 404 if not found |
//! | `PUT`  | `/appointments/:id` | Insert or replace |

use std::sync::Arc;

use agenda_core::{
  appointment::{Appointment, AppointmentState},
  service::Scheduler,
  store::NoveltyStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::{availability::PairParams, error::ApiError};

/// `GET /appointments?provider_id=&date=`
pub async fn list<S: NoveltyStore>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Query(params): Query<PairParams>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
  let appointments = scheduler
    .list_appointments(params.provider_id, params.date)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(appointments))
}

/// `GET /appointments/:id`
pub async fn get_one<S: NoveltyStore>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
  let appointment = scheduler
    .get_appointment(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(appointment))
}

#[derive(Debug, Deserialize)]
pub struct SaveBody {
  pub provider_id:         Uuid,
  pub date:                NaiveDate,
  pub time:                NaiveTime,
  #[serde(default = "pending")]
  pub state:               AppointmentState,
  #[serde(default)]
  pub novelty_id:          Option<Uuid>,
  #[serde(default)]
  pub cancellation_reason: Option<String>,
}

fn pending() -> AppointmentState { AppointmentState::Pending }

/// `PUT /appointments/:id`
pub async fn save_one<S: NoveltyStore>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<SaveBody>,
) -> Result<Json<Appointment>, ApiError> {
  let appointment = Appointment {
    appointment_id:      id,
    provider_id:         body.provider_id,
    date:                body.date,
    time:                body.time,
    state:               body.state,
    novelty_id:          body.novelty_id,
    cancellation_reason: body.cancellation_reason,
  };
  let saved = scheduler
    .save_appointment(appointment)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(saved))
}
