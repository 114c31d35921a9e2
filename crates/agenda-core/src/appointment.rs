//! Appointments, as far as novelty reconciliation is concerned.
//!
//! Appointments are created and owned elsewhere. The reconciliation engine
//! only ever touches `state`, `cancellation_reason`, and `novelty_id`.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentState {
  Pending,
  Confirmed,
  InProgress,
  /// Cancelled because a provider novelty made the slot unworkable.
  CancelledByNovelty,
  /// Cancelled for any other reason (client request, no-show, ...).
  Cancelled,
  Finalized,
}

impl AppointmentState {
  /// States a new or updated novelty may cancel.
  pub const RECONCILABLE: [Self; 3] = [Self::Pending, Self::Confirmed, Self::InProgress];

  pub fn is_reconcilable(self) -> bool { Self::RECONCILABLE.contains(&self) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
  pub appointment_id:      Uuid,
  pub provider_id:         Uuid,
  pub date:                NaiveDate,
  pub time:                NaiveTime,
  pub state:               AppointmentState,
  /// Identifier of the novelty that cancelled this appointment.
  pub novelty_id:          Option<Uuid>,
  pub cancellation_reason: Option<String>,
}

impl Appointment {
  /// A pending appointment with no cancellation history.
  pub fn pending(provider_id: Uuid, date: NaiveDate, time: NaiveTime) -> Self {
    Self {
      appointment_id: Uuid::new_v4(),
      provider_id,
      date,
      time,
      state: AppointmentState::Pending,
      novelty_id: None,
      cancellation_reason: None,
    }
  }
}
