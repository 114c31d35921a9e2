//! Novelty validation and field normalisation.
//!
//! Validation is split in two:
//!
//! - [`normalize`] checks the shape of the input against the business hours
//!   and produces the stored time fields for the requested state.
//! - [`validate_new`] additionally applies the date rule for the state and
//!   the one-active-novelty-per-(provider, date) rule. The store supplies the
//!   duplicate lookup from inside its transaction.
//!
//! All violations found are collected; callers receive them together.

use chrono::{NaiveDate, NaiveTime};

use crate::{
  error::{NON_FIELD_ERRORS, ValidationErrors},
  hours::{self, BusinessHours},
  novelty::{AbsenceKind, NewNovelty, Novelty, NoveltyState},
};

/// Everything a rule needs to know about "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext {
  pub hours: BusinessHours,
  pub today: NaiveDate,
}

/// The stored time fields derived from a validated input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizedFields {
  pub absence_kind:  Option<AbsenceKind>,
  pub absence_start: Option<NaiveTime>,
  pub absence_end:   Option<NaiveTime>,
  pub entry_time:    Option<NaiveTime>,
  pub exit_time:     Option<NaiveTime>,
}

impl From<&Novelty> for NormalizedFields {
  fn from(n: &Novelty) -> Self {
    Self {
      absence_kind:  n.absence_kind,
      absence_start: n.absence_start,
      absence_end:   n.absence_end,
      entry_time:    n.entry_time,
      exit_time:     n.exit_time,
    }
  }
}

fn fmt_hm(t: NaiveTime) -> String { t.format("%H:%M").to_string() }

fn check_allowed(
  errors: &mut ValidationErrors,
  hours: &BusinessHours,
  field: &str,
  value: Option<NaiveTime>,
) {
  if let Some(t) = value
    && !hours.is_allowed_time(t)
  {
    errors.push(
      field,
      format!(
        "must be between {} and {}",
        fmt_hm(hours.min_allowed),
        fmt_hm(hours.max_allowed)
      ),
    );
  }
}

/// Check the per-state required fields and time bounds, and derive the
/// stored time fields.
pub fn normalize(
  input: &NewNovelty,
  hours: &BusinessHours,
) -> Result<NormalizedFields, ValidationErrors> {
  let mut errors = ValidationErrors::new();

  // Bounds apply to every supplied time, whether or not the state uses it.
  check_allowed(&mut errors, hours, "arrival_time", input.arrival_time);
  check_allowed(&mut errors, hours, "absence_start", input.absence_start);
  check_allowed(&mut errors, hours, "absence_end", input.absence_end);

  let fields = match input.state {
    NoveltyState::Late => match input.arrival_time {
      None => {
        errors.push("arrival_time", "an arrival time is required for a late arrival");
        NormalizedFields::default()
      }
      Some(arrival) => {
        if !hours.is_valid_late_arrival(arrival) && hours.is_allowed_time(arrival) {
          errors.push(
            "arrival_time",
            format!("must be after {}", fmt_hm(hours.base_start)),
          );
        }
        NormalizedFields {
          absence_kind:  None,
          absence_start: None,
          absence_end:   None,
          entry_time:    Some(arrival),
          exit_time:     Some(hours.base_end),
        }
      }
    },

    NoveltyState::Absent => match input.absence_kind {
      None => {
        errors.push("absence_kind", "an absence kind is required for an absence");
        NormalizedFields::default()
      }
      Some(AbsenceKind::FullDay) => NormalizedFields {
        absence_kind:  Some(AbsenceKind::FullDay),
        absence_start: Some(hours.base_start),
        absence_end:   Some(hours.base_end),
        entry_time:    None,
        exit_time:     None,
      },
      Some(AbsenceKind::PartialHours) => {
        let end = input.absence_end.unwrap_or(hours.base_end);
        match input.absence_start {
          None => errors.push(
            "absence_start",
            "a start time is required for a partial absence",
          ),
          // Out-of-bounds times were already reported above.
          Some(start) if !hours.is_valid_absence_window(start, end) => {
            if start >= end {
              errors.push("absence_end", "must be after the absence start");
            }
          }
          Some(_) => {}
        }
        NormalizedFields {
          absence_kind:  Some(AbsenceKind::PartialHours),
          absence_start: input.absence_start,
          absence_end:   Some(end),
          entry_time:    Some(hours.base_start),
          exit_time:     Some(hours.base_end),
        }
      }
    },

    NoveltyState::Voided => {
      errors.push("state", "novelties are voided through the void operation");
      NormalizedFields::default()
    }
  };

  errors.into_result().map(|()| fields)
}

/// Fields for an edit of a voided novelty.
///
/// An input that is itself `Voided` has no per-state shape, so supplied
/// values are kept and omitted ones fall back to `stored`. Any other state is
/// normalised as usual.
pub fn normalize_voided(
  input: &NewNovelty,
  hours: &BusinessHours,
  stored: NormalizedFields,
) -> Result<NormalizedFields, ValidationErrors> {
  if input.state != NoveltyState::Voided {
    return normalize(input, hours);
  }
  Ok(NormalizedFields {
    absence_kind:  input.absence_kind.or(stored.absence_kind),
    absence_start: input.absence_start.or(stored.absence_start),
    absence_end:   input.absence_end.or(stored.absence_end),
    entry_time:    input.arrival_time.or(stored.entry_time),
    exit_time:     stored.exit_time,
  })
}

/// Full validation of an input that will become (or stay) an active novelty.
///
/// `has_active_duplicate` reports whether another non-voided novelty already
/// exists for the same provider and date.
pub fn validate_new(
  input: &NewNovelty,
  ctx: RuleContext,
  has_active_duplicate: bool,
) -> Result<NormalizedFields, ValidationErrors> {
  let mut errors = match normalize(input, &ctx.hours) {
    Ok(fields) => {
      let mut errors = ValidationErrors::new();
      check_schedule(&mut errors, input, ctx.today, has_active_duplicate);
      return errors.into_result().map(|()| fields);
    }
    Err(errors) => errors,
  };
  check_schedule(&mut errors, input, ctx.today, has_active_duplicate);
  Err(errors)
}

fn check_schedule(
  errors: &mut ValidationErrors,
  input: &NewNovelty,
  today: NaiveDate,
  has_active_duplicate: bool,
) {
  if has_active_duplicate {
    errors.push(
      NON_FIELD_ERRORS,
      "an active novelty already exists for this provider on this date",
    );
  }

  if !hours::date_allowed_for_state(input.state, input.date, today) {
    let message = match input.state {
      NoveltyState::Absent => {
        "absences must be scheduled at least one day ahead (from tomorrow)"
      }
      NoveltyState::Late => "late arrivals may be recorded from today onwards",
      NoveltyState::Voided => "a novelty cannot be recorded before today",
    };
    errors.push("date", message);
  }
}

/// A void requires a non-blank reason.
pub fn validate_void_reason(reason: &str) -> Result<(), ValidationErrors> {
  if reason.trim().is_empty() {
    Err(ValidationErrors::single("void_reason", "a reason is required to void a novelty"))
  } else {
    Ok(())
  }
}
