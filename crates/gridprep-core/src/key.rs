//! Composite location-key construction.
//!
//! The key joins city and state code with a fixed separator and is the single
//! rule shared by the ranking SQL, the enrichment join and the in-process
//! generators. Grouping for duplicate *detection* is case- and
//! whitespace-insensitive; the key itself is case-sensitive so the join only
//! matches rows spelled the way the surviving dimension row is spelled.

/// Separator between city and state code, e.g. `Mendes_RJ`.
pub const KEY_SEPARATOR: char = '_';

/// Build the composite key for a dimension or fact row.
///
/// Missing city/state on the fact side must be passed as `""` — the key is
/// total over its inputs and never null.
pub fn location_key(city: &str, state_code: &str) -> String {
  format!("{city}{KEY_SEPARATOR}{state_code}")
}

/// The normalisation applied to each key part for duplicate grouping.
pub fn group_part(part: &str) -> String {
  part.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn key_is_city_underscore_state() {
    assert_eq!(location_key("Mendes", "RJ"), "Mendes_RJ");
  }

  #[test]
  fn key_is_total_over_empty_parts() {
    assert_eq!(location_key("", ""), "_");
    assert_eq!(location_key("Rio", ""), "Rio_");
  }

  #[test]
  fn grouping_ignores_case_and_whitespace() {
    assert_eq!(group_part("  Rio "), group_part("rio"));
    assert_ne!(location_key("  Rio ", "RJ"), location_key("rio", "RJ"));
  }
}
