//! The `NoveltyStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `agenda-store-sqlite`).
//! Higher layers (`agenda-api`, the [`crate::service::Scheduler`]) depend on
//! this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  appointment::Appointment,
  notify::Notice,
  novelty::{NewNovelty, Novelty, NoveltyState},
  validate::RuleContext,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Filter shared by [`NoveltyStore::list_novelties`] and
/// [`NoveltyStore::stats`]. Every field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoveltyFilter {
  pub provider_id: Option<Uuid>,
  /// Inclusive lower bound on the novelty date.
  pub date_from:   Option<NaiveDate>,
  /// Inclusive upper bound on the novelty date.
  pub date_to:     Option<NaiveDate>,
  pub state:       Option<NoveltyState>,
}

impl NoveltyFilter {
  /// Novelties dated exactly `date`.
  pub fn on(date: NaiveDate) -> Self {
    Self {
      date_from: Some(date),
      date_to: Some(date),
      ..Self::default()
    }
  }
}

/// Aggregate counts over a filtered set of novelties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoveltyStats {
  pub total:         u64,
  pub absences:      u64,
  pub late_arrivals: u64,
  pub voided:        u64,
  /// Novelties dated today.
  pub today:         u64,
}

impl NoveltyStats {
  /// Count `novelties`, treating those dated `today` as today's.
  pub fn tally<'a>(novelties: impl IntoIterator<Item = &'a Novelty>, today: NaiveDate) -> Self {
    novelties.into_iter().fold(Self::default(), |mut acc, n| {
      acc.total += 1;
      match n.state {
        NoveltyState::Absent => acc.absences += 1,
        NoveltyState::Late => acc.late_arrivals += 1,
        NoveltyState::Voided => acc.voided += 1,
      }
      if n.date == today {
        acc.today += 1;
      }
      acc
    })
  }
}

/// The result of a committed novelty mutation: the stored novelty and the
/// notices its cascade produced, waiting to be dispatched.
#[derive(Debug, Clone)]
pub struct Committed {
  pub novelty: Novelty,
  pub notices: Vec<Notice>,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Implemented by backend error types so upper layers can recover the
/// user-correctable domain error (validation, not-found, conflict) from a
/// backend failure.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&crate::Error>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a novelty store backend.
///
/// Each mutation runs validation, the novelty write, and the full appointment
/// cascade as one atomic unit. If any step fails nothing is persisted.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait NoveltyStore: Send + Sync {
  type Error: StoreError + From<crate::Error>;

  // ── Novelty mutations ─────────────────────────────────────────────────

  /// Validate and record a new novelty, then cancel the appointments it
  /// affects.
  fn create_novelty(
    &self,
    input: NewNovelty,
    ctx: RuleContext,
  ) -> impl Future<Output = Result<Committed, Self::Error>> + Send + '_;

  /// Re-validate and overwrite an existing novelty, then cancel the
  /// appointments the new values affect. Appointments the old values
  /// cancelled are left as they are.
  ///
  /// A voided novelty keeps its state; its fields are overwritten without
  /// date or duplicate checks and no cascade runs.
  fn update_novelty(
    &self,
    id: Uuid,
    input: NewNovelty,
    ctx: RuleContext,
  ) -> impl Future<Output = Result<Committed, Self::Error>> + Send + '_;

  /// Move a novelty to [`NoveltyState::Voided`] and reactivate the
  /// appointments it cancelled. `reason` must not be blank.
  fn void_novelty(
    &self,
    id: Uuid,
    reason: String,
  ) -> impl Future<Output = Result<Committed, Self::Error>> + Send + '_;

  // ── Novelty reads ─────────────────────────────────────────────────────

  /// Retrieve a novelty by UUID. Returns `None` if not found.
  fn get_novelty(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Novelty>, Self::Error>> + Send + '_;

  /// Novelties matching `filter`, newest date first, then newest record
  /// first.
  fn list_novelties<'a>(
    &'a self,
    filter: &'a NoveltyFilter,
  ) -> impl Future<Output = Result<Vec<Novelty>, Self::Error>> + Send + 'a;

  /// Every non-voided novelty for the pair.
  fn active_novelties(
    &self,
    provider_id: Uuid,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Novelty>, Self::Error>> + Send + '_;

  fn stats<'a>(
    &'a self,
    filter: &'a NoveltyFilter,
    today: NaiveDate,
  ) -> impl Future<Output = Result<NoveltyStats, Self::Error>> + Send + 'a;

  // ── Appointments ──────────────────────────────────────────────────────

  /// Insert or replace an appointment supplied by the booking system.
  fn save_appointment(
    &self,
    appointment: Appointment,
  ) -> impl Future<Output = Result<Appointment, Self::Error>> + Send + '_;

  fn get_appointment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Appointment>, Self::Error>> + Send + '_;

  /// All appointments for the pair, ordered by time.
  fn list_appointments(
    &self,
    provider_id: Uuid,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Appointment>, Self::Error>> + Send + '_;

  /// Appointments whose novelty back-reference is `novelty_id`.
  fn appointments_for_novelty(
    &self,
    novelty_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Appointment>, Self::Error>> + Send + '_;
}
