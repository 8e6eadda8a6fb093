//! The location dimension and its derived, ranked form.
//!
//! `LocationRecord` rows are sourced externally (CSV feeds) and are read-only
//! input to the pipeline. `RankedLocation` is the materialized snapshot row:
//! the original columns plus the resolved state code, the composite key and a
//! data-quality flag.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A row of the state lookup table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
  pub state_id:   String,
  pub state_code: String,
}

/// A row of the location dimension table as sourced externally.
///
/// `location_id` is deliberately not assumed unique — dirty feeds repeat it.
/// Physical identity is the store-assigned insertion-order sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
  pub location_id: String,
  pub state_id:    String,
  pub city:        String,
}

/// Data-quality flag assigned by the ranking engine.
///
/// Exactly one row per duplicate group is `Valid` (the survivor, lowest
/// identity first); every other row in the group is `DuplicateError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DqStatus {
  #[serde(rename = "VALID")]
  Valid,
  #[serde(rename = "DUPLICATE_ERROR")]
  DuplicateError,
}

impl DqStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      DqStatus::Valid          => "VALID",
      DqStatus::DuplicateError => "DUPLICATE_ERROR",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "VALID"           => Ok(DqStatus::Valid),
      "DUPLICATE_ERROR" => Ok(DqStatus::DuplicateError),
      other             => Err(Error::UnknownDqStatus(other.to_string())),
    }
  }
}

/// A snapshot row: original dimension columns + derived fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedLocation {
  pub row_seq:      i64,
  pub location_id:  String,
  pub state_id:     String,
  pub city:         String,
  pub state_code:   String,
  pub location_key: String,
  pub dq_status:    DqStatus,
}
