//! Availability projection for one provider on one date.
//!
//! Read-only: combines the base operating window with the active novelties
//! for the pair into a report for client display. Never persisted.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  hours::{BusinessHours, TimeWindow},
  novelty::{Disruption, Novelty, NoveltySummary},
};

pub const DEFAULT_STATUS: &str = "Regular hours available";
pub const FULL_DAY_STATUS: &str = "Unavailable all day";

/// Why a window is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableCause {
  FullDayAbsence,
  PartialAbsence,
  LateArrival,
}

/// A blocked span of the working day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableWindow {
  pub start:         NaiveTime,
  pub end:           NaiveTime,
  /// Partial absences block their end minute too; the other causes do not.
  pub end_inclusive: bool,
  pub cause:         UnavailableCause,
  pub novelty_id:    Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
  pub provider_id: Uuid,
  pub date:        NaiveDate,
  pub base_window: TimeWindow,
  pub unavailable: Vec<UnavailableWindow>,
  pub novelties:   Vec<NoveltySummary>,
  pub status:      String,
}

impl AvailabilityReport {
  pub fn is_fully_available(&self) -> bool { self.unavailable.is_empty() }
}

/// Build the report from whatever novelties the store returned for the pair.
///
/// More than one active novelty should never exist for a pair, but every one
/// supplied is folded in. A full-day absence blocks the whole base window and
/// takes precedence over narrower windows. Voided novelties are skipped.
pub fn build_report(
  provider_id: Uuid,
  date: NaiveDate,
  novelties: &[Novelty],
  hours: &BusinessHours,
) -> AvailabilityReport {
  let base = hours.base_window();
  let mut unavailable = Vec::new();
  let mut summaries = Vec::new();
  let mut statuses: Vec<String> = Vec::new();
  let mut full_day = false;

  for novelty in novelties.iter().filter(|n| n.is_active()) {
    let mut summary = NoveltySummary::from(novelty);

    match novelty.disruption() {
      Some(Disruption::FullDay) => {
        full_day = true;
        summary.affected = Some(base);
        unavailable.clear();
        unavailable.push(UnavailableWindow {
          start:         base.start,
          end:           base.end,
          end_inclusive: false,
          cause:         UnavailableCause::FullDayAbsence,
          novelty_id:    novelty.novelty_id,
        });
      }
      Some(Disruption::Partial { start, end }) => {
        summary.affected = Some(TimeWindow::new(start, end));
        statuses.push(format!(
          "Unavailable from {} to {}",
          start.format("%H:%M"),
          end.format("%H:%M")
        ));
        if !full_day {
          unavailable.push(UnavailableWindow {
            start,
            end,
            end_inclusive: true,
            cause: UnavailableCause::PartialAbsence,
            novelty_id: novelty.novelty_id,
          });
        }
      }
      Some(Disruption::Late { arrival }) => {
        summary.affected = Some(TimeWindow::new(base.start, arrival));
        statuses.push(format!("Provider arrives late at {}", arrival.format("%H:%M")));
        if !full_day {
          unavailable.push(UnavailableWindow {
            start:         base.start,
            end:           arrival,
            end_inclusive: false,
            cause:         UnavailableCause::LateArrival,
            novelty_id:    novelty.novelty_id,
          });
        }
      }
      None => {}
    }

    summaries.push(summary);
  }

  let status = if full_day {
    FULL_DAY_STATUS.to_owned()
  } else if statuses.is_empty() {
    DEFAULT_STATUS.to_owned()
  } else {
    statuses.join("; ")
  };

  AvailabilityReport {
    provider_id,
    date,
    base_window: base,
    unavailable,
    novelties: summaries,
    status,
  }
}
