//! Error type for `agenda-store-sqlite`.

use agenda_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] agenda_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored discriminant column held a value no enum variant matches.
  #[error("unknown {column} value: {value:?}")]
  UnknownValue { column: &'static str, value: String },
}

impl StoreError for Error {
  fn domain(&self) -> Option<&agenda_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

impl From<Error> for tokio_rusqlite::Error {
  /// Lets decode failures inside a connection closure abort it with `?`.
  fn from(e: Error) -> Self { tokio_rusqlite::Error::Other(Box::new(e)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
