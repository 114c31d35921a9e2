//! Novelty types: recorded disruptions to a provider's working day.
//!
//! A novelty is never physically deleted. Voiding moves it into the terminal
//! [`NoveltyState::Voided`] state, where it remains as history and no longer
//! takes part in duplicate or date checks.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hours::{BusinessHours, TimeWindow};

// ─── State ───────────────────────────────────────────────────────────────────

/// Lifecycle state of a novelty. `Voided` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoveltyState {
  Absent,
  Late,
  Voided,
}

impl NoveltyState {
  /// Active novelties count towards the one-per-(provider, date) invariant.
  pub fn is_active(self) -> bool { !matches!(self, Self::Voided) }

  /// Human-readable rendering, used in cancellation reasons.
  pub fn label(self) -> &'static str {
    match self {
      Self::Absent => "Absent",
      Self::Late => "Late",
      Self::Voided => "Voided",
    }
  }
}

/// How much of the day an absence covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceKind {
  FullDay,
  PartialHours,
}

// ─── Novelty ─────────────────────────────────────────────────────────────────

/// A single disruption to one provider's schedule on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Novelty {
  pub novelty_id:    Uuid,
  pub provider_id:   Uuid,
  pub date:          NaiveDate,
  pub state:         NoveltyState,
  /// Set iff the novelty was recorded as an absence.
  pub absence_kind:  Option<AbsenceKind>,
  pub absence_start: Option<NaiveTime>,
  pub absence_end:   Option<NaiveTime>,
  /// Nominal entry time; for a late arrival, the actual arrival.
  pub entry_time:    Option<NaiveTime>,
  /// Nominal exit time.
  pub exit_time:     Option<NaiveTime>,
  pub reason:        Option<String>,
  pub void_reason:   Option<String>,
  pub voided_at:     Option<DateTime<Utc>>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// The part of the working day a novelty takes away, derived from its state
/// and normalised fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disruption {
  /// The whole base operating window.
  FullDay,
  /// `[start, end]`, inclusive at both ends.
  Partial { start: NaiveTime, end: NaiveTime },
  /// `[base_start, arrival)`.
  Late { arrival: NaiveTime },
}

impl Novelty {
  pub fn is_active(&self) -> bool { self.state.is_active() }

  /// The actual arrival time of a late provider.
  pub fn arrival_time(&self) -> Option<NaiveTime> {
    match self.state {
      NoveltyState::Late => self.entry_time,
      _ => None,
    }
  }

  /// What this novelty blocks, or `None` once voided (or if its stored
  /// fields are incomplete).
  pub fn disruption(&self) -> Option<Disruption> {
    match (self.state, self.absence_kind) {
      (NoveltyState::Absent, Some(AbsenceKind::FullDay)) => Some(Disruption::FullDay),
      (NoveltyState::Absent, Some(AbsenceKind::PartialHours)) => {
        match (self.absence_start, self.absence_end) {
          (Some(start), Some(end)) => Some(Disruption::Partial { start, end }),
          _ => None,
        }
      }
      (NoveltyState::Late, _) => {
        self.entry_time.map(|arrival| Disruption::Late { arrival })
      }
      _ => None,
    }
  }

  /// A sentence describing the novelty for client display.
  pub fn describe(&self, hours: &BusinessHours) -> String {
    match self.state {
      NoveltyState::Late => match self.entry_time {
        Some(arrival) => format!("Provider arrives late at {}.", arrival.format("%H:%M")),
        None => "Provider arrives late; no arrival time recorded.".to_owned(),
      },
      NoveltyState::Absent => match self.disruption() {
        Some(Disruption::FullDay) => format!(
          "Provider is absent all day ({} - {}).",
          hours.base_start.format("%H:%M"),
          hours.base_end.format("%H:%M"),
        ),
        Some(Disruption::Partial { start, end }) => format!(
          "Provider is absent from {} to {}.",
          start.format("%H:%M"),
          end.format("%H:%M"),
        ),
        _ => "Provider is absent for part of the day; no window recorded.".to_owned(),
      },
      NoveltyState::Voided => format!(
        "Novelty voided: {}",
        self.void_reason.as_deref().unwrap_or("no reason recorded")
      ),
    }
  }
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// Input to [`crate::store::NoveltyStore::create_novelty`] and
/// [`crate::store::NoveltyStore::update_novelty`].
///
/// Fields that do not apply to `state` are ignored and normalised away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNovelty {
  pub provider_id:   Uuid,
  pub date:          NaiveDate,
  pub state:         NoveltyState,
  #[serde(default)]
  pub absence_kind:  Option<AbsenceKind>,
  #[serde(default)]
  pub absence_start: Option<NaiveTime>,
  #[serde(default)]
  pub absence_end:   Option<NaiveTime>,
  /// Required for [`NoveltyState::Late`].
  #[serde(default)]
  pub arrival_time:  Option<NaiveTime>,
  #[serde(default)]
  pub reason:        Option<String>,
}

impl NewNovelty {
  /// A full-day absence.
  pub fn full_day(provider_id: Uuid, date: NaiveDate) -> Self {
    Self {
      provider_id,
      date,
      state: NoveltyState::Absent,
      absence_kind: Some(AbsenceKind::FullDay),
      absence_start: None,
      absence_end: None,
      arrival_time: None,
      reason: None,
    }
  }

  /// An absence covering `[start, end]`; `end` defaults to the base end.
  pub fn partial(
    provider_id: Uuid,
    date: NaiveDate,
    start: NaiveTime,
    end: Option<NaiveTime>,
  ) -> Self {
    Self {
      absence_kind: Some(AbsenceKind::PartialHours),
      absence_start: Some(start),
      absence_end: end,
      ..Self::full_day(provider_id, date)
    }
  }

  /// A late arrival at `arrival`.
  pub fn late(provider_id: Uuid, date: NaiveDate, arrival: NaiveTime) -> Self {
    Self {
      state: NoveltyState::Late,
      absence_kind: None,
      arrival_time: Some(arrival),
      ..Self::full_day(provider_id, date)
    }
  }

  pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
    self.reason = Some(reason.into());
    self
  }
}

// ─── Summaries ───────────────────────────────────────────────────────────────

/// The compact form of a novelty embedded in availability reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoveltySummary {
  pub novelty_id:   Uuid,
  pub state:        NoveltyState,
  pub absence_kind: Option<AbsenceKind>,
  pub reason:       Option<String>,
  /// The window this novelty blocks, if any.
  pub affected:     Option<TimeWindow>,
}

impl From<&Novelty> for NoveltySummary {
  fn from(n: &Novelty) -> Self {
    Self {
      novelty_id:   n.novelty_id,
      state:        n.state,
      absence_kind: n.absence_kind,
      reason:       n.reason.clone(),
      affected:     None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn t(h: u32, m: u32) -> NaiveTime { NaiveTime::from_hms_opt(h, m, 0).unwrap() }

  fn novelty(state: NoveltyState) -> Novelty {
    let now = Utc::now();
    Novelty {
      novelty_id: Uuid::new_v4(),
      provider_id: Uuid::new_v4(),
      date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
      state,
      absence_kind: None,
      absence_start: None,
      absence_end: None,
      entry_time: None,
      exit_time: None,
      reason: None,
      void_reason: None,
      voided_at: None,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn late_disruption_uses_entry_time() {
    let mut n = novelty(NoveltyState::Late);
    n.entry_time = Some(t(11, 0));
    assert_eq!(n.disruption(), Some(Disruption::Late { arrival: t(11, 0) }));
    assert_eq!(n.arrival_time(), Some(t(11, 0)));
    assert_eq!(n.describe(&BusinessHours::default()), "Provider arrives late at 11:00.");
  }

  #[test]
  fn voided_novelty_blocks_nothing() {
    let mut n = novelty(NoveltyState::Voided);
    n.absence_kind = Some(AbsenceKind::FullDay);
    n.void_reason = Some("recorded by mistake".into());
    assert_eq!(n.disruption(), None);
    assert!(!n.is_active());
    assert_eq!(
      n.describe(&BusinessHours::default()),
      "Novelty voided: recorded by mistake"
    );
  }

  #[test]
  fn partial_without_window_has_no_disruption() {
    let mut n = novelty(NoveltyState::Absent);
    n.absence_kind = Some(AbsenceKind::PartialHours);
    n.absence_start = Some(t(10, 0));
    assert_eq!(n.disruption(), None);
  }

  #[test]
  fn state_serialises_lowercase() {
    let json = serde_json::to_string(&NoveltyState::Absent).unwrap();
    assert_eq!(json, "\"absent\"");
    let kind: AbsenceKind = serde_json::from_str("\"partial_hours\"").unwrap();
    assert_eq!(kind, AbsenceKind::PartialHours);
  }
}
