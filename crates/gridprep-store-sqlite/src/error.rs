//! Error type for `gridprep-store-sqlite`.

use gridprep_core::store::StageFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] gridprep_core::Error),

  #[error("database error: {0}")]
  Database(#[source] tokio_rusqlite::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("date parse error: {0}")]
  DateParse(String),
}

/// Stage code run inside a [`tokio_rusqlite::Connection::call`] closure can
/// only return `tokio_rusqlite::Error`; domain failures travel through its
/// `Other` variant and are unwrapped back into [`Error::Core`] here.
impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Other(inner) => {
        match inner.downcast::<gridprep_core::Error>() {
          Ok(core)   => Error::Core(*core),
          Err(other) => Error::Database(tokio_rusqlite::Error::Other(other)),
        }
      }
      other => Error::Database(other),
    }
  }
}

impl StageFailure for Error {
  fn precondition(&self) -> Option<String> {
    match self {
      Error::Core(
        e @ (gridprep_core::Error::SnapshotMissing
        | gridprep_core::Error::TableMissing(_)),
      ) => Some(e.to_string()),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
