//! Notification events emitted by the reconciliation cascade.
//!
//! Delivery is best-effort. A sender's failure is logged by the caller and
//! never rolls back or fails the mutation that produced the notice.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{appointment::Appointment, novelty::Novelty};

/// Something a client should be told about their appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
  /// The appointment was cancelled because of `novelty`.
  Cancellation {
    appointment: Appointment,
    novelty:     Novelty,
  },
  /// The novelty that cancelled the appointment was voided.
  Reactivation { appointment: Appointment },
}

impl Notice {
  pub fn appointment(&self) -> &Appointment {
    match self {
      Self::Cancellation { appointment, .. } | Self::Reactivation { appointment } => {
        appointment
      }
    }
  }
}

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotificationError(pub String);

/// Delivers notices to clients (email, SMS, a queue, ...).
pub trait NotificationSender: Send + Sync {
  fn send(&self, notice: &Notice) -> Result<(), NotificationError>;
}

/// Writes every notice to the log. Used when no delivery channel is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationSender for LogNotifier {
  fn send(&self, notice: &Notice) -> Result<(), NotificationError> {
    match notice {
      Notice::Cancellation { appointment, novelty } => tracing::info!(
        appointment_id = %appointment.appointment_id,
        novelty_id = %novelty.novelty_id,
        date = %appointment.date,
        time = %appointment.time.format("%H:%M"),
        "appointment cancelled by provider novelty ({})",
        novelty.state.label()
      ),
      Notice::Reactivation { appointment } => tracing::info!(
        appointment_id = %appointment.appointment_id,
        date = %appointment.date,
        time = %appointment.time.format("%H:%M"),
        "appointment reactivated"
      ),
    }
    Ok(())
  }
}
