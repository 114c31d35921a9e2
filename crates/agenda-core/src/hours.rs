//! Business-hour rules shared by validation, overlap detection, and the
//! availability projection.
//!
//! Every function here is pure: the caller supplies "today" explicitly, so
//! date-window rules can be exercised against any fixed calendar day.

use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, novelty::NoveltyState};

// ─── Windows ─────────────────────────────────────────────────────────────────

/// A span of wall-clock time within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
  pub start: NaiveTime,
  pub end:   NaiveTime,
}

impl TimeWindow {
  pub fn new(start: NaiveTime, end: NaiveTime) -> Self { Self { start, end } }
}

// ─── Business hours ──────────────────────────────────────────────────────────

/// The business-wide operating window and the outer bounds any recorded time
/// may fall within.
///
/// Handed to the scheduler at construction; the store receives it through
/// [`crate::validate::RuleContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessHours {
  /// Nominal start of every provider's working day.
  pub base_start:  NaiveTime,
  /// Nominal end of every provider's working day.
  pub base_end:    NaiveTime,
  /// Earliest time a novelty may reference.
  pub min_allowed: NaiveTime,
  /// Latest time a novelty may reference.
  pub max_allowed: NaiveTime,
}

const fn hm(hour: u32, minute: u32) -> NaiveTime {
  match NaiveTime::from_hms_opt(hour, minute, 0) {
    Some(t) => t,
    None => panic!("invalid constant time"),
  }
}

pub const DEFAULT_BASE_START: NaiveTime = hm(10, 0);
pub const DEFAULT_BASE_END: NaiveTime = hm(20, 0);
pub const DEFAULT_MIN_ALLOWED: NaiveTime = hm(7, 0);
pub const DEFAULT_MAX_ALLOWED: NaiveTime = hm(22, 0);

impl Default for BusinessHours {
  fn default() -> Self {
    Self {
      base_start:  DEFAULT_BASE_START,
      base_end:    DEFAULT_BASE_END,
      min_allowed: DEFAULT_MIN_ALLOWED,
      max_allowed: DEFAULT_MAX_ALLOWED,
    }
  }
}

impl BusinessHours {
  /// Reject overrides that would make the rules contradictory.
  pub fn validate(&self) -> Result<()> {
    let ordered = self.min_allowed <= self.base_start
      && self.base_start < self.base_end
      && self.base_end <= self.max_allowed;
    if ordered {
      Ok(())
    } else {
      Err(Error::InvalidHours(format!(
        "expected min_allowed <= base_start < base_end <= max_allowed, got {} / {} / {} / {}",
        self.min_allowed, self.base_start, self.base_end, self.max_allowed
      )))
    }
  }

  /// `[base_start, base_end)`.
  pub fn base_window(&self) -> TimeWindow {
    TimeWindow::new(self.base_start, self.base_end)
  }

  /// Whether `t` lies in `[min_allowed, max_allowed]`.
  pub fn is_allowed_time(&self, t: NaiveTime) -> bool {
    self.min_allowed <= t && t <= self.max_allowed
  }

  /// A partial absence must be non-empty and fully inside the allowed bounds.
  pub fn is_valid_absence_window(&self, start: NaiveTime, end: NaiveTime) -> bool {
    start < end && self.is_allowed_time(start) && self.is_allowed_time(end)
  }

  /// A late arrival must be allowed and strictly after the base start.
  pub fn is_valid_late_arrival(&self, t: NaiveTime) -> bool {
    self.is_allowed_time(t) && t > self.base_start
  }
}

// ─── Date rules ──────────────────────────────────────────────────────────────

/// The day after `today`, saturating at the calendar maximum.
pub fn tomorrow(today: NaiveDate) -> NaiveDate {
  today.checked_add_days(Days::new(1)).unwrap_or(today)
}

/// The earliest date a novelty in `state` may be recorded for, or `None` when
/// the state carries no date constraint.
pub fn earliest_date_for_state(
  state: NoveltyState,
  today: NaiveDate,
) -> Option<NaiveDate> {
  match state {
    // Absences must be scheduled at least one day ahead.
    NoveltyState::Absent => Some(tomorrow(today)),
    NoveltyState::Late => Some(today),
    NoveltyState::Voided => None,
  }
}

/// Whether `date` satisfies the date constraint of `state`.
pub fn date_allowed_for_state(
  state: NoveltyState,
  date: NaiveDate,
  today: NaiveDate,
) -> bool {
  earliest_date_for_state(state, today).is_none_or(|earliest| date >= earliest)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn t(h: u32, m: u32) -> NaiveTime { NaiveTime::from_hms_opt(h, m, 0).unwrap() }

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn defaults_match_business_window() {
    let hours = BusinessHours::default();
    assert_eq!(hours.base_window(), TimeWindow::new(t(10, 0), t(20, 0)));
    assert!(hours.validate().is_ok());
  }

  #[test]
  fn absence_window_bounds() {
    let hours = BusinessHours::default();
    assert!(hours.is_valid_absence_window(t(7, 0), t(22, 0)));
    assert!(hours.is_valid_absence_window(t(10, 0), t(12, 0)));
    assert!(!hours.is_valid_absence_window(t(12, 0), t(12, 0)));
    assert!(!hours.is_valid_absence_window(t(13, 0), t(12, 0)));
    assert!(!hours.is_valid_absence_window(t(6, 59), t(12, 0)));
    assert!(!hours.is_valid_absence_window(t(10, 0), t(22, 1)));
  }

  #[test]
  fn late_arrival_must_follow_base_start() {
    let hours = BusinessHours::default();
    assert!(!hours.is_valid_late_arrival(t(10, 0)));
    assert!(hours.is_valid_late_arrival(t(10, 1)));
    assert!(hours.is_valid_late_arrival(t(22, 0)));
    assert!(!hours.is_valid_late_arrival(t(22, 30)));
  }

  #[test]
  fn date_rules_depend_on_state() {
    let today = d(2030, 3, 10);
    assert!(!date_allowed_for_state(NoveltyState::Absent, today, today));
    assert!(date_allowed_for_state(NoveltyState::Absent, d(2030, 3, 11), today));
    assert!(date_allowed_for_state(NoveltyState::Late, today, today));
    assert!(!date_allowed_for_state(NoveltyState::Late, d(2030, 3, 9), today));
    assert!(date_allowed_for_state(NoveltyState::Voided, d(2000, 1, 1), today));
  }

  #[test]
  fn inconsistent_overrides_are_rejected() {
    let hours = BusinessHours {
      base_start: t(21, 0),
      ..BusinessHours::default()
    };
    assert!(matches!(hours.validate(), Err(Error::InvalidHours(_))));
  }
}
