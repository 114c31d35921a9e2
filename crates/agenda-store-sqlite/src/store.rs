//! [`SqliteStore`], the SQLite implementation of [`NoveltyStore`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior, ffi};
use uuid::Uuid;

use agenda_core::{
  appointment::Appointment,
  error::{Error as CoreError, ValidationErrors},
  novelty::{NewNovelty, Novelty, NoveltyState},
  reconcile,
  store::{Committed, NoveltyFilter, NoveltyStats, NoveltyStore},
  validate::{self, NormalizedFields, RuleContext},
};

use crate::{
  Result,
  cascade::{TxAppointments, query_appointments, upsert_appointment},
  encode::{
    APPOINTMENT_COLUMNS, NOVELTY_COLUMNS, RawNovelty, encode_absence_kind, encode_date,
    encode_dt, encode_novelty_state, encode_time, encode_uuid,
  },
  schema::SCHEMA,
};

/// What a mutation closure hands back: a committed result, or a domain error
/// after the transaction was rolled back.
type Outcome = std::result::Result<Committed, CoreError>;

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn query_novelties(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<Novelty>, tokio_rusqlite::Error> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params, RawNovelty::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  let mut out = Vec::with_capacity(raws.len());
  for raw in raws {
    out.push(raw.into_novelty()?);
  }
  Ok(out)
}

fn load_novelty(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> Result<Option<Novelty>, tokio_rusqlite::Error> {
  let raw = conn
    .query_row(
      &format!("SELECT {NOVELTY_COLUMNS} FROM novelties WHERE novelty_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawNovelty::from_row,
    )
    .optional()?;
  Ok(raw.map(RawNovelty::into_novelty).transpose()?)
}

/// Whether a non-voided novelty other than `excluding` exists for the pair.
fn has_active_novelty(
  conn: &rusqlite::Connection,
  provider_id: Uuid,
  date: NaiveDate,
  excluding: Option<Uuid>,
) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS (
       SELECT 1 FROM novelties
       WHERE provider_id = ?1 AND date = ?2 AND state != 'voided'
         AND (?3 IS NULL OR novelty_id != ?3)
     )",
    rusqlite::params![
      encode_uuid(provider_id),
      encode_date(date),
      excluding.map(encode_uuid)
    ],
    |row| row.get(0),
  )
}

fn novelty_exists(conn: &rusqlite::Connection, id: Uuid) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS (SELECT 1 FROM novelties WHERE novelty_id = ?1)",
    rusqlite::params![encode_uuid(id)],
    |row| row.get(0),
  )
}

fn insert_novelty(conn: &rusqlite::Connection, n: &Novelty) -> rusqlite::Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO novelties ({NOVELTY_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
    ),
    rusqlite::params![
      encode_uuid(n.novelty_id),
      encode_uuid(n.provider_id),
      encode_date(n.date),
      encode_novelty_state(n.state),
      n.absence_kind.map(encode_absence_kind),
      n.absence_start.map(encode_time),
      n.absence_end.map(encode_time),
      n.entry_time.map(encode_time),
      n.exit_time.map(encode_time),
      n.reason,
      n.void_reason,
      n.voided_at.map(encode_dt),
      encode_dt(n.created_at),
      encode_dt(n.updated_at),
    ],
  )?;
  Ok(())
}

fn update_novelty_row(conn: &rusqlite::Connection, n: &Novelty) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE novelties SET
       provider_id = ?2, date = ?3, state = ?4, absence_kind = ?5,
       absence_start = ?6, absence_end = ?7, entry_time = ?8, exit_time = ?9,
       reason = ?10, void_reason = ?11, voided_at = ?12, updated_at = ?13
     WHERE novelty_id = ?1",
    rusqlite::params![
      encode_uuid(n.novelty_id),
      encode_uuid(n.provider_id),
      encode_date(n.date),
      encode_novelty_state(n.state),
      n.absence_kind.map(encode_absence_kind),
      n.absence_start.map(encode_time),
      n.absence_end.map(encode_time),
      n.entry_time.map(encode_time),
      n.exit_time.map(encode_time),
      n.reason,
      n.void_reason,
      n.voided_at.map(encode_dt),
      encode_dt(n.updated_at),
    ],
  )?;
  Ok(())
}

/// A write tripped a unique index. CHECK and foreign-key failures are not
/// conflicts.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _) if f.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

/// Write `novelty` with `write`, mapping a uniqueness violation to
/// [`CoreError::Conflict`].
fn write_or_conflict(
  conn: &rusqlite::Connection,
  novelty: &Novelty,
  write: fn(&rusqlite::Connection, &Novelty) -> rusqlite::Result<()>,
) -> Result<Option<CoreError>, tokio_rusqlite::Error> {
  match write(conn, novelty) {
    Ok(()) => Ok(None),
    Err(e) if is_unique_violation(&e) => {
      tracing::debug!(
        provider_id = %novelty.provider_id,
        date = %novelty.date,
        "active novelty index rejected write"
      );
      Ok(Some(CoreError::Conflict {
        provider_id: novelty.provider_id,
        date:        novelty.date,
      }))
    }
    Err(e) => Err(e.into()),
  }
}

/// The current instant at the precision timestamps are stored with.
fn timestamp() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

fn blank_to_none(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

/// Copy the input and its normalised time fields onto `novelty`.
fn apply_input(novelty: &mut Novelty, input: NewNovelty, fields: NormalizedFields) {
  novelty.provider_id = input.provider_id;
  novelty.date = input.date;
  novelty.absence_kind = fields.absence_kind;
  novelty.absence_start = fields.absence_start;
  novelty.absence_end = fields.absence_end;
  novelty.entry_time = fields.entry_time;
  novelty.exit_time = fields.exit_time;
  novelty.reason = blank_to_none(input.reason);
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An agenda novelty store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── NoveltyStore impl ───────────────────────────────────────────────────────

impl NoveltyStore for SqliteStore {
  type Error = crate::Error;

  // ── Mutations ─────────────────────────────────────────────────────────────

  async fn create_novelty(&self, input: NewNovelty, ctx: RuleContext) -> Result<Committed> {
    let outcome: Outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let duplicate = has_active_novelty(&tx, input.provider_id, input.date, None)?;
        let fields = match validate::validate_new(&input, ctx, duplicate) {
          Ok(fields) => fields,
          Err(errors) => return Ok(Err(CoreError::from(errors))),
        };

        let now = timestamp();
        let mut novelty = Novelty {
          novelty_id:    Uuid::new_v4(),
          provider_id:   input.provider_id,
          date:          input.date,
          state:         input.state,
          absence_kind:  None,
          absence_start: None,
          absence_end:   None,
          entry_time:    None,
          exit_time:     None,
          reason:        None,
          void_reason:   None,
          voided_at:     None,
          created_at:    now,
          updated_at:    now,
        };
        apply_input(&mut novelty, input, fields);

        if let Some(conflict) = write_or_conflict(&tx, &novelty, insert_novelty)? {
          return Ok(Err(conflict));
        }
        let notices = reconcile::on_novelty_committed(&mut TxAppointments(&tx), &novelty)?;

        tx.commit()?;
        Ok(Ok(Committed { novelty, notices }))
      })
      .await?;

    Ok(outcome?)
  }

  async fn update_novelty(
    &self,
    id: Uuid,
    input: NewNovelty,
    ctx: RuleContext,
  ) -> Result<Committed> {
    let outcome: Outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut novelty) = load_novelty(&tx, id)? else {
          return Ok(Err(CoreError::NoveltyNotFound(id)));
        };

        // Voided rows are history: persist the values, skip the schedule
        // rules, keep the state, and leave appointments alone.
        if novelty.state == NoveltyState::Voided {
          let stored = NormalizedFields::from(&novelty);
          let fields = match validate::normalize_voided(&input, &ctx.hours, stored) {
            Ok(fields) => fields,
            Err(errors) => return Ok(Err(CoreError::from(errors))),
          };
          apply_input(&mut novelty, input, fields);
          novelty.updated_at = timestamp();
          update_novelty_row(&tx, &novelty)?;
          tx.commit()?;
          return Ok(Ok(Committed { novelty, notices: Vec::new() }));
        }

        let duplicate = has_active_novelty(&tx, input.provider_id, input.date, Some(id))?;
        let fields = match validate::validate_new(&input, ctx, duplicate) {
          Ok(fields) => fields,
          Err(errors) => return Ok(Err(CoreError::from(errors))),
        };

        novelty.state = input.state;
        apply_input(&mut novelty, input, fields);
        novelty.updated_at = timestamp();

        if let Some(conflict) = write_or_conflict(&tx, &novelty, update_novelty_row)? {
          return Ok(Err(conflict));
        }
        let notices = reconcile::on_novelty_committed(&mut TxAppointments(&tx), &novelty)?;

        tx.commit()?;
        Ok(Ok(Committed { novelty, notices }))
      })
      .await?;

    Ok(outcome?)
  }

  async fn void_novelty(&self, id: Uuid, reason: String) -> Result<Committed> {
    let outcome: Outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut novelty) = load_novelty(&tx, id)? else {
          return Ok(Err(CoreError::NoveltyNotFound(id)));
        };

        let mut errors = ValidationErrors::new();
        if novelty.state == NoveltyState::Voided {
          errors.push("state", "this novelty is already voided");
        }
        if let Err(reason_errors) = validate::validate_void_reason(&reason) {
          errors.append(reason_errors);
        }
        if !errors.is_empty() {
          return Ok(Err(CoreError::from(errors)));
        }

        let now = timestamp();
        novelty.state = NoveltyState::Voided;
        novelty.void_reason = Some(reason.trim().to_owned());
        novelty.voided_at = Some(now);
        novelty.updated_at = now;
        update_novelty_row(&tx, &novelty)?;

        let notices = reconcile::on_novelty_voided(&mut TxAppointments(&tx), &novelty)?;

        tx.commit()?;
        Ok(Ok(Committed { novelty, notices }))
      })
      .await?;

    Ok(outcome?)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_novelty(&self, id: Uuid) -> Result<Option<Novelty>> {
    Ok(self.conn.call(move |conn| load_novelty(conn, id)).await?)
  }

  async fn list_novelties<'a>(&'a self, filter: &'a NoveltyFilter) -> Result<Vec<Novelty>> {
    let provider = filter.provider_id.map(encode_uuid);
    let from = filter.date_from.map(encode_date);
    let to = filter.date_to.map(encode_date);
    let state = filter.state.map(encode_novelty_state);

    let novelties = self
      .conn
      .call(move |conn| {
        query_novelties(
          conn,
          &format!(
            "SELECT {NOVELTY_COLUMNS} FROM novelties
             WHERE (?1 IS NULL OR provider_id = ?1)
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
               AND (?4 IS NULL OR state = ?4)
             ORDER BY date DESC, created_at DESC, rowid DESC"
          ),
          rusqlite::params![provider, from, to, state],
        )
      })
      .await?;
    Ok(novelties)
  }

  async fn active_novelties(&self, provider_id: Uuid, date: NaiveDate) -> Result<Vec<Novelty>> {
    let provider = encode_uuid(provider_id);
    let date = encode_date(date);

    let novelties = self
      .conn
      .call(move |conn| {
        query_novelties(
          conn,
          &format!(
            "SELECT {NOVELTY_COLUMNS} FROM novelties
             WHERE provider_id = ?1 AND date = ?2 AND state != 'voided'
             ORDER BY created_at"
          ),
          rusqlite::params![provider, date],
        )
      })
      .await?;
    Ok(novelties)
  }

  async fn stats<'a>(&'a self, filter: &'a NoveltyFilter, today: NaiveDate) -> Result<NoveltyStats> {
    let novelties = self.list_novelties(filter).await?;
    Ok(NoveltyStats::tally(&novelties, today))
  }

  // ── Appointments ──────────────────────────────────────────────────────────

  async fn save_appointment(&self, appointment: Appointment) -> Result<Appointment> {
    let saved = appointment.clone();
    let outcome: std::result::Result<(), CoreError> = self
      .conn
      .call(move |conn| {
        if let Some(novelty_id) = saved.novelty_id
          && !novelty_exists(conn, novelty_id)?
        {
          return Ok(Err(CoreError::from(ValidationErrors::single(
            "novelty_id",
            "no novelty with this id exists",
          ))));
        }
        upsert_appointment(conn, &saved)?;
        Ok(Ok(()))
      })
      .await?;
    outcome?;
    Ok(appointment)
  }

  async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
    let id = encode_uuid(id);
    let mut found = self
      .conn
      .call(move |conn| {
        query_appointments(
          conn,
          &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE appointment_id = ?1"),
          rusqlite::params![id],
        )
      })
      .await?;
    Ok(found.pop())
  }

  async fn list_appointments(
    &self,
    provider_id: Uuid,
    date: NaiveDate,
  ) -> Result<Vec<Appointment>> {
    let provider = encode_uuid(provider_id);
    let date = encode_date(date);

    let appointments = self
      .conn
      .call(move |conn| {
        query_appointments(
          conn,
          &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE provider_id = ?1 AND date = ?2
             ORDER BY time"
          ),
          rusqlite::params![provider, date],
        )
      })
      .await?;
    Ok(appointments)
  }

  async fn appointments_for_novelty(&self, novelty_id: Uuid) -> Result<Vec<Appointment>> {
    let id = encode_uuid(novelty_id);

    let appointments = self
      .conn
      .call(move |conn| {
        query_appointments(
          conn,
          &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE novelty_id = ?1
             ORDER BY date, time"
          ),
          rusqlite::params![id],
        )
      })
      .await?;
    Ok(appointments)
  }
}
