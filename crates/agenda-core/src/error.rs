//! Error types for `agenda-core`.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Key used for violations that do not belong to a single input field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

// ─── Validation ──────────────────────────────────────────────────────────────

/// One violated rule, keyed by the input field it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

/// A field-keyed list of violated rules, suitable for client-side display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  /// Convenience constructor for a single violation.
  pub fn single(field: &str, message: impl Into<String>) -> Self {
    let mut errors = Self::new();
    errors.push(field, message);
    errors
  }

  pub fn push(&mut self, field: &str, message: impl Into<String>) {
    self.0.push(FieldError {
      field:   field.to_owned(),
      message: message.into(),
    });
  }

  /// Move every violation in `other` onto the end of this list.
  pub fn append(&mut self, mut other: ValidationErrors) { self.0.append(&mut other.0); }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn iter(&self) -> impl Iterator<Item = &FieldError> { self.0.iter() }

  /// Whether any violation was recorded against `field`.
  pub fn has_field(&self, field: &str) -> bool {
    self.0.iter().any(|e| e.field == field)
  }

  /// `Ok(())` when empty, otherwise the collected errors.
  pub fn into_result(self) -> Result<(), Self> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for e in &self.0 {
      if !first {
        f.write_str("; ")?;
      }
      write!(f, "{}: {}", e.field, e.message)?;
      first = false;
    }
    Ok(())
  }
}

// ─── Domain error ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("novelty not found: {0}")]
  NoveltyNotFound(Uuid),

  #[error("appointment not found: {0}")]
  AppointmentNotFound(Uuid),

  /// Lost a concurrent insert race for the same (provider, date) pair.
  #[error("an active novelty already exists for provider {provider_id} on {date}")]
  Conflict { provider_id: Uuid, date: NaiveDate },

  #[error("invalid business hours: {0}")]
  InvalidHours(String),
}

impl Error {
  /// The field-keyed shape a caller sees for this error, if it is
  /// user-correctable.
  pub fn validation_errors(&self) -> Option<ValidationErrors> {
    match self {
      Self::Validation(errors) => Some(errors.clone()),
      Self::Conflict { .. } => Some(ValidationErrors::single(
        "date",
        "an active novelty already exists for this provider on this date",
      )),
      _ => None,
    }
  }
}

impl From<ValidationErrors> for Error {
  fn from(errors: ValidationErrors) -> Self { Self::Validation(errors) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
