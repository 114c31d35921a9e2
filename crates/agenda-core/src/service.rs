//! [`Scheduler`], the contracts exposed to API and presentation layers.
//!
//! The scheduler owns the business hours, the clock, and the notification
//! sender. It hands the rule context to the store, lets the store commit the
//! novelty together with its cascade, and only then dispatches the resulting
//! notices. A failing sender is logged and otherwise ignored.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error,
  appointment::Appointment,
  availability::{AvailabilityReport, build_report},
  clock::{Clock, SystemClock},
  hours::{self, BusinessHours, TimeWindow},
  notify::{LogNotifier, NotificationSender},
  novelty::{NewNovelty, Novelty},
  store::{Committed, NoveltyFilter, NoveltyStats, NoveltyStore},
  validate::RuleContext,
};

// ─── Detail view ─────────────────────────────────────────────────────────────

/// The date rules in force when a detail view was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRules {
  pub today:    NaiveDate,
  /// Earliest date an absence may be recorded for.
  pub tomorrow: NaiveDate,
}

/// A novelty with everything a client needs to display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoveltyDetail {
  pub novelty:               Novelty,
  pub message:               String,
  pub base_window:           TimeWindow,
  pub date_rules:            DateRules,
  /// Appointments whose novelty back-reference is this novelty.
  pub affected_appointments: Vec<Appointment>,
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

pub struct Scheduler<S> {
  store:    S,
  hours:    BusinessHours,
  clock:    Arc<dyn Clock>,
  notifier: Arc<dyn NotificationSender>,
}

impl<S: NoveltyStore> Scheduler<S> {
  /// A scheduler using the system clock and logging notifier.
  pub fn new(store: S, hours: BusinessHours) -> Self {
    Self {
      store,
      hours,
      clock: Arc::new(SystemClock),
      notifier: Arc::new(LogNotifier),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSender>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn hours(&self) -> &BusinessHours { &self.hours }

  pub fn today(&self) -> NaiveDate { self.clock.today() }

  fn context(&self) -> RuleContext {
    RuleContext {
      hours: self.hours,
      today: self.clock.today(),
    }
  }

  // ── Mutations ─────────────────────────────────────────────────────────

  pub async fn create_novelty(&self, input: NewNovelty) -> Result<Novelty, S::Error> {
    let committed = self.store.create_novelty(input, self.context()).await?;
    tracing::info!(
      novelty_id = %committed.novelty.novelty_id,
      provider_id = %committed.novelty.provider_id,
      date = %committed.novelty.date,
      cancelled = committed.notices.len(),
      "novelty created"
    );
    Ok(self.dispatch(committed))
  }

  pub async fn update_novelty(
    &self,
    id: Uuid,
    input: NewNovelty,
  ) -> Result<Novelty, S::Error> {
    let committed = self.store.update_novelty(id, input, self.context()).await?;
    tracing::info!(
      novelty_id = %id,
      provider_id = %committed.novelty.provider_id,
      date = %committed.novelty.date,
      cancelled = committed.notices.len(),
      "novelty updated"
    );
    Ok(self.dispatch(committed))
  }

  pub async fn void_novelty(&self, id: Uuid, reason: String) -> Result<Novelty, S::Error> {
    let committed = self.store.void_novelty(id, reason).await?;
    tracing::info!(
      novelty_id = %id,
      reactivated = committed.notices.len(),
      "novelty voided"
    );
    Ok(self.dispatch(committed))
  }

  /// Send every notice, swallowing failures. The mutation has already
  /// committed by the time this runs.
  fn dispatch(&self, committed: Committed) -> Novelty {
    for notice in &committed.notices {
      if let Err(e) = self.notifier.send(notice) {
        tracing::warn!(
          appointment_id = %notice.appointment().appointment_id,
          error = %e,
          "failed to deliver appointment notice"
        );
      }
    }
    committed.novelty
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get_novelty(&self, id: Uuid) -> Result<NoveltyDetail, S::Error> {
    let novelty = self
      .store
      .get_novelty(id)
      .await?
      .ok_or(Error::NoveltyNotFound(id))?;
    let affected_appointments = self.store.appointments_for_novelty(id).await?;
    let today = self.today();

    Ok(NoveltyDetail {
      message: novelty.describe(&self.hours),
      base_window: self.hours.base_window(),
      date_rules: DateRules {
        today,
        tomorrow: hours::tomorrow(today),
      },
      affected_appointments,
      novelty,
    })
  }

  pub async fn list_novelties(&self, filter: &NoveltyFilter) -> Result<Vec<Novelty>, S::Error> {
    self.store.list_novelties(filter).await
  }

  /// Novelties dated today, in any state.
  pub async fn list_today(&self) -> Result<Vec<Novelty>, S::Error> {
    self.store.list_novelties(&NoveltyFilter::on(self.today())).await
  }

  pub async fn get_availability(
    &self,
    provider_id: Uuid,
    date: NaiveDate,
  ) -> Result<AvailabilityReport, S::Error> {
    let novelties = self.store.active_novelties(provider_id, date).await?;
    Ok(build_report(provider_id, date, &novelties, &self.hours))
  }

  pub async fn get_stats(&self, filter: &NoveltyFilter) -> Result<NoveltyStats, S::Error> {
    self.store.stats(filter, self.today()).await
  }

  // ── Appointments ──────────────────────────────────────────────────────

  pub async fn save_appointment(&self, appointment: Appointment) -> Result<Appointment, S::Error> {
    self.store.save_appointment(appointment).await
  }

  pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, S::Error> {
    Ok(
      self
        .store
        .get_appointment(id)
        .await?
        .ok_or(Error::AppointmentNotFound(id))?,
    )
  }

  pub async fn list_appointments(
    &self,
    provider_id: Uuid,
    date: NaiveDate,
  ) -> Result<Vec<Appointment>, S::Error> {
    self.store.list_appointments(provider_id, date).await
  }
}
