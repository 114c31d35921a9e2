//! [`AppointmentRepository`] over an open SQLite transaction.
//!
//! The reconciliation engine in `agenda-core` drives the cascade; this adapter
//! only reads and writes `appointments` rows on the caller's transaction so the
//! cascade commits or rolls back with the novelty write.

use agenda_core::{
  appointment::{Appointment, AppointmentState},
  reconcile::AppointmentRepository,
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::encode::{
  APPOINTMENT_COLUMNS, RawAppointment, encode_appointment_state, encode_date, encode_time,
  encode_uuid,
};

/// Appointment access bound to a connection or transaction.
pub struct TxAppointments<'a>(pub &'a rusqlite::Connection);

/// Run `sql` with `params` and decode every returned appointment row.
pub fn query_appointments(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<Appointment>, tokio_rusqlite::Error> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params, RawAppointment::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  let mut out = Vec::with_capacity(raws.len());
  for raw in raws {
    out.push(raw.into_appointment()?);
  }
  Ok(out)
}

/// Insert the appointment, or overwrite every column of an existing row.
pub fn upsert_appointment(
  conn: &rusqlite::Connection,
  appointment: &Appointment,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO appointments (
       appointment_id, provider_id, date, time, state, novelty_id, cancellation_reason
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(appointment_id) DO UPDATE SET
       provider_id         = excluded.provider_id,
       date                = excluded.date,
       time                = excluded.time,
       state               = excluded.state,
       novelty_id          = excluded.novelty_id,
       cancellation_reason = excluded.cancellation_reason",
    rusqlite::params![
      encode_uuid(appointment.appointment_id),
      encode_uuid(appointment.provider_id),
      encode_date(appointment.date),
      encode_time(appointment.time),
      encode_appointment_state(appointment.state),
      appointment.novelty_id.map(encode_uuid),
      appointment.cancellation_reason,
    ],
  )?;
  Ok(())
}

impl AppointmentRepository for TxAppointments<'_> {
  type Error = tokio_rusqlite::Error;

  fn find_active_by_provider_and_date(
    &mut self,
    provider_id: Uuid,
    date: NaiveDate,
  ) -> Result<Vec<Appointment>, Self::Error> {
    let [a, b, c] = AppointmentState::RECONCILABLE.map(encode_appointment_state);
    query_appointments(
      self.0,
      &format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE provider_id = ?1 AND date = ?2 AND state IN (?3, ?4, ?5)
         ORDER BY time"
      ),
      rusqlite::params![encode_uuid(provider_id), encode_date(date), a, b, c],
    )
  }

  fn find_by_novelty_and_state(
    &mut self,
    novelty_id: Uuid,
    state: AppointmentState,
  ) -> Result<Vec<Appointment>, Self::Error> {
    query_appointments(
      self.0,
      &format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE novelty_id = ?1 AND state = ?2
         ORDER BY time"
      ),
      rusqlite::params![encode_uuid(novelty_id), encode_appointment_state(state)],
    )
  }

  fn save(&mut self, appointment: &Appointment) -> Result<(), Self::Error> {
    upsert_appointment(self.0, appointment)?;
    Ok(())
  }
}
