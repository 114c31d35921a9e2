//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, dates `YYYY-MM-DD`, times `HH:MM:SS` with
//! a fractional part only when one is set.
//! Dates sort lexically, so range filters and ordering happen in SQL. UUIDs
//! are stored as hyphenated lowercase strings.

use agenda_core::{
  appointment::{Appointment, AppointmentState},
  novelty::{AbsenceKind, Novelty, NoveltyState},
};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// Fixed-width so stored timestamps order lexically.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M:%S%.f").to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M:%S%.f").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Discriminants ───────────────────────────────────────────────────────────

pub fn encode_novelty_state(s: NoveltyState) -> &'static str {
  match s {
    NoveltyState::Absent => "absent",
    NoveltyState::Late => "late",
    NoveltyState::Voided => "voided",
  }
}

pub fn decode_novelty_state(s: &str) -> Result<NoveltyState> {
  match s {
    "absent" => Ok(NoveltyState::Absent),
    "late" => Ok(NoveltyState::Late),
    "voided" => Ok(NoveltyState::Voided),
    other => Err(Error::UnknownValue {
      column: "novelty state",
      value:  other.to_owned(),
    }),
  }
}

pub fn encode_absence_kind(k: AbsenceKind) -> &'static str {
  match k {
    AbsenceKind::FullDay => "full_day",
    AbsenceKind::PartialHours => "partial_hours",
  }
}

pub fn decode_absence_kind(s: &str) -> Result<AbsenceKind> {
  match s {
    "full_day" => Ok(AbsenceKind::FullDay),
    "partial_hours" => Ok(AbsenceKind::PartialHours),
    other => Err(Error::UnknownValue {
      column: "absence kind",
      value:  other.to_owned(),
    }),
  }
}

pub fn encode_appointment_state(s: AppointmentState) -> &'static str {
  match s {
    AppointmentState::Pending => "pending",
    AppointmentState::Confirmed => "confirmed",
    AppointmentState::InProgress => "in_progress",
    AppointmentState::CancelledByNovelty => "cancelled_by_novelty",
    AppointmentState::Cancelled => "cancelled",
    AppointmentState::Finalized => "finalized",
  }
}

pub fn decode_appointment_state(s: &str) -> Result<AppointmentState> {
  match s {
    "pending" => Ok(AppointmentState::Pending),
    "confirmed" => Ok(AppointmentState::Confirmed),
    "in_progress" => Ok(AppointmentState::InProgress),
    "cancelled_by_novelty" => Ok(AppointmentState::CancelledByNovelty),
    "cancelled" => Ok(AppointmentState::Cancelled),
    "finalized" => Ok(AppointmentState::Finalized),
    other => Err(Error::UnknownValue {
      column: "appointment state",
      value:  other.to_owned(),
    }),
  }
}

fn decode_opt_time(s: Option<String>) -> Result<Option<NaiveTime>> {
  s.as_deref().map(decode_time).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawNovelty::from_row`].
pub const NOVELTY_COLUMNS: &str = "novelty_id, provider_id, date, state, absence_kind,
   absence_start, absence_end, entry_time, exit_time,
   reason, void_reason, voided_at, created_at, updated_at";

/// Raw strings read directly from a `novelties` row.
pub struct RawNovelty {
  pub novelty_id:    String,
  pub provider_id:   String,
  pub date:          String,
  pub state:         String,
  pub absence_kind:  Option<String>,
  pub absence_start: Option<String>,
  pub absence_end:   Option<String>,
  pub entry_time:    Option<String>,
  pub exit_time:     Option<String>,
  pub reason:        Option<String>,
  pub void_reason:   Option<String>,
  pub voided_at:     Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawNovelty {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      novelty_id:    row.get(0)?,
      provider_id:   row.get(1)?,
      date:          row.get(2)?,
      state:         row.get(3)?,
      absence_kind:  row.get(4)?,
      absence_start: row.get(5)?,
      absence_end:   row.get(6)?,
      entry_time:    row.get(7)?,
      exit_time:     row.get(8)?,
      reason:        row.get(9)?,
      void_reason:   row.get(10)?,
      voided_at:     row.get(11)?,
      created_at:    row.get(12)?,
      updated_at:    row.get(13)?,
    })
  }

  pub fn into_novelty(self) -> Result<Novelty> {
    Ok(Novelty {
      novelty_id:    decode_uuid(&self.novelty_id)?,
      provider_id:   decode_uuid(&self.provider_id)?,
      date:          decode_date(&self.date)?,
      state:         decode_novelty_state(&self.state)?,
      absence_kind:  self
        .absence_kind
        .as_deref()
        .map(decode_absence_kind)
        .transpose()?,
      absence_start: decode_opt_time(self.absence_start)?,
      absence_end:   decode_opt_time(self.absence_end)?,
      entry_time:    decode_opt_time(self.entry_time)?,
      exit_time:     decode_opt_time(self.exit_time)?,
      reason:        self.reason,
      void_reason:   self.void_reason,
      voided_at:     self.voided_at.as_deref().map(decode_dt).transpose()?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawAppointment::from_row`].
pub const APPOINTMENT_COLUMNS: &str =
  "appointment_id, provider_id, date, time, state, novelty_id, cancellation_reason";

/// Raw strings read directly from an `appointments` row.
pub struct RawAppointment {
  pub appointment_id:      String,
  pub provider_id:         String,
  pub date:                String,
  pub time:                String,
  pub state:               String,
  pub novelty_id:          Option<String>,
  pub cancellation_reason: Option<String>,
}

impl RawAppointment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      appointment_id:      row.get(0)?,
      provider_id:         row.get(1)?,
      date:                row.get(2)?,
      time:                row.get(3)?,
      state:               row.get(4)?,
      novelty_id:          row.get(5)?,
      cancellation_reason: row.get(6)?,
    })
  }

  pub fn into_appointment(self) -> Result<Appointment> {
    Ok(Appointment {
      appointment_id:      decode_uuid(&self.appointment_id)?,
      provider_id:         decode_uuid(&self.provider_id)?,
      date:                decode_date(&self.date)?,
      time:                decode_time(&self.time)?,
      state:               decode_appointment_state(&self.state)?,
      novelty_id:          self.novelty_id.as_deref().map(decode_uuid).transpose()?,
      cancellation_reason: self.cancellation_reason,
    })
  }
}
