//! The customer fact table and synthetic customer drafting.
//!
//! A draft carries everything except the id; the store assigns the id from
//! its own sequence on insert (never read-then-increment in the application).

use chrono::NaiveDate;
use rand::{Rng, seq::SliceRandom as _};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, key::location_key};

/// A persisted customer row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
  pub customer_id:   i64,
  pub customer_name: String,
  pub city:          String,
  pub state_code:    String,
  pub customer_kind: String,
  pub joined_on:     NaiveDate,
}

/// A customer not yet inserted — no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDraft {
  pub customer_name: String,
  pub city:          String,
  pub state_code:    String,
  pub customer_kind: String,
  pub joined_on:     NaiveDate,
}

impl CustomerDraft {
  /// The composite key this draft would enrich under.
  pub fn location_key(&self) -> String {
    location_key(&self.city, &self.state_code)
  }
}

// ─── Reference data ──────────────────────────────────────────────────────────

/// A valid location as cached for coherent draft generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLocation {
  pub location_id: String,
  pub state_id:    String,
  pub city:        String,
  pub state_code:  String,
}

/// Slowly-changing reference data loaded once and injected into handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
  pub locations:      Vec<ReferenceLocation>,
  pub customer_kinds: Vec<String>,
  pub join_window:    (NaiveDate, NaiveDate),
}

impl ReferenceData {
  /// Join-date window used for generated customers.
  pub fn default_join_window() -> (NaiveDate, NaiveDate) {
    (
      NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
      NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
    )
  }

  /// Defined fallback when the initial load fails: no locations (sampling
  /// reports the failure), stock customer kinds, a whole-year window.
  pub fn fallback() -> Self {
    ReferenceData {
      locations:      Vec::new(),
      customer_kinds: vec![
        "Residential".to_string(),
        "Commercial".to_string(),
        "Industrial".to_string(),
      ],
      join_window:    (
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
      ),
    }
  }
}

// ─── Drafting ────────────────────────────────────────────────────────────────

const GIVEN_NAMES: &[&str] = &[
  "Ana", "Bruno", "Camila", "Diego", "Elisa", "Felipe", "Gabriela", "Hugo",
  "Isabela", "João", "Larissa", "Marcos", "Natália", "Otávio", "Paula",
  "Rafael", "Sofia", "Thiago", "Vera", "William",
];

const FAMILY_NAMES: &[&str] = &[
  "Almeida", "Barbosa", "Cardoso", "Dias", "Ferreira", "Gomes", "Lima",
  "Martins", "Nascimento", "Oliveira", "Pereira", "Ribeiro", "Santos",
  "Silva", "Souza", "Teixeira",
];

/// Draft a random customer coherent with the reference data: location and
/// kind come from the cache, the join date falls inside the window.
pub fn draft_customer(
  reference: &ReferenceData,
  rng:       &mut impl Rng,
) -> Result<CustomerDraft> {
  let location = reference
    .locations
    .choose(rng)
    .ok_or(Error::NoReferenceLocations)?;

  let kind = reference
    .customer_kinds
    .choose(rng)
    .map(String::as_str)
    .unwrap_or("Residential");

  let (start, end) = reference.join_window;
  let span = (end - start).num_days().max(0);
  let joined_on = start + chrono::Days::new(rng.gen_range(0..=span) as u64);

  let given  = GIVEN_NAMES.choose(rng).copied().unwrap_or("Ana");
  let family = FAMILY_NAMES.choose(rng).copied().unwrap_or("Silva");

  Ok(CustomerDraft {
    customer_name: format!("{given} {family}"),
    city:          location.city.clone(),
    state_code:    location.state_code.clone(),
    customer_kind: kind.to_string(),
    joined_on,
  })
}
