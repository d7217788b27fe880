//! Error type for `tally-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain-level failure (not-found, conflict, invariant violation).
  #[error(transparent)]
  Domain(#[from] tally_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decimal parse error: {0}")]
  Decimal(#[from] rust_decimal::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

/// Classify a store error into the domain taxonomy. Domain failures pass
/// through; everything else is a store-level or corrupt-value failure.
impl From<Error> for tally_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Domain(d) => d,
      Error::Database(db) => tally_core::Error::Store(db.to_string()),
      Error::Uuid(e) => tally_core::Error::Corrupt(e.to_string()),
      Error::Decimal(e) => tally_core::Error::Corrupt(e.to_string()),
      Error::DateParse(m) => tally_core::Error::Corrupt(m),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
