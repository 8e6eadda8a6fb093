//! Row decoding helpers: raw column tuples into core types.

use chrono::NaiveDate;

use gridprep_core::{
  customer::CustomerRecord,
  location::{DqStatus, RankedLocation},
};

use crate::{Error, Result};

/// Dates are stored as ISO 8601 `YYYY-MM-DD` text.
pub fn encode_date(d: NaiveDate) -> String {
  d.format("%Y-%m-%d").to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

/// A `customers` row as fetched, before date decoding.
pub struct RawCustomer {
  pub customer_id:   i64,
  pub customer_name: String,
  pub city:          Option<String>,
  pub state_code:    Option<String>,
  pub customer_kind: Option<String>,
  pub joined_on:     String,
}

impl RawCustomer {
  pub fn into_record(self) -> Result<CustomerRecord> {
    Ok(CustomerRecord {
      customer_id:   self.customer_id,
      customer_name: self.customer_name,
      city:          self.city.unwrap_or_default(),
      state_code:    self.state_code.unwrap_or_default(),
      customer_kind: self.customer_kind.unwrap_or_default(),
      joined_on:     decode_date(&self.joined_on)?,
    })
  }
}

/// A `locations_ranked` row as fetched, before status decoding.
pub struct RawRankedLocation {
  pub row_seq:      i64,
  pub location_id:  String,
  pub state_id:     String,
  pub city:         String,
  pub state_code:   String,
  pub location_key: String,
  pub dq_status:    String,
}

impl RawRankedLocation {
  pub fn into_ranked(self) -> Result<RankedLocation> {
    let dq_status = DqStatus::parse(&self.dq_status)?;
    Ok(RankedLocation {
      row_seq: self.row_seq,
      location_id: self.location_id,
      state_id: self.state_id,
      city: self.city,
      state_code: self.state_code,
      location_key: self.location_key,
      dq_status,
    })
  }
}
