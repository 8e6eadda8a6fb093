//! CSV-to-table loader.
//!
//! Maps the raw feed files in a directory onto their warehouse tables with
//! replace semantics (delete-then-insert in one transaction per file).
//! Headers are lower-cased and space-normalised before deserialisation, so
//! feeds exported with `Customer Id`-style headers still load.

use std::path::Path;

use serde::de::DeserializeOwned;

use gridprep_core::{
  customer::CustomerRecord,
  fixtures::{LossRecord, ReadingRecord},
  location::{LocationRecord, StateRecord},
};

use crate::{Result, store::SqliteStore};

/// Feed files the loader recognises, in load order (lookups first).
pub const FEED_FILES: &[&str] = &[
  "states.csv",
  "locations.csv",
  "customers.csv",
  "energy_readings.csv",
  "energy_losses.csv",
];

/// Outcome of loading one feed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
  pub file: String,
  pub rows: u64,
}

/// Load every recognised feed file found under `dir`.
///
/// Missing files are skipped with a warning — a partial feed drop is normal
/// during development. A malformed file aborts the whole run; the files
/// already loaded stay loaded (each file is its own transaction).
pub async fn load_dir(store: &SqliteStore, dir: &Path) -> Result<Vec<LoadReport>> {
  let mut reports = Vec::new();

  for file in FEED_FILES {
    let path = dir.join(file);
    if !path.exists() {
      tracing::warn!(%file, "feed file not found; skipping");
      continue;
    }

    let rows = match *file {
      "states.csv" => {
        store.replace_states(read_csv::<StateRecord>(&path)?).await?
      }
      "locations.csv" => {
        store
          .replace_locations(read_csv::<LocationRecord>(&path)?)
          .await?
      }
      "customers.csv" => {
        store
          .replace_customers(read_csv::<CustomerRecord>(&path)?)
          .await?
      }
      "energy_readings.csv" => {
        store
          .replace_readings(read_csv::<ReadingRecord>(&path)?)
          .await?
      }
      "energy_losses.csv" => {
        store.replace_losses(read_csv::<LossRecord>(&path)?).await?
      }
      _ => unreachable!("FEED_FILES covers all match arms"),
    };

    tracing::info!(%file, rows, "feed file loaded");
    reports.push(LoadReport { file: file.to_string(), rows });
  }

  Ok(reports)
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
  let mut reader = csv::Reader::from_path(path)?;

  let normalised: csv::StringRecord = reader
    .headers()?
    .iter()
    .map(normalise_header)
    .collect();
  reader.set_headers(normalised);

  reader
    .deserialize()
    .collect::<std::result::Result<Vec<T>, csv::Error>>()
    .map_err(Into::into)
}

fn normalise_header(header: &str) -> String {
  header.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
  use super::normalise_header;

  #[test]
  fn headers_are_lowercased_and_space_normalised() {
    assert_eq!(normalise_header(" Customer Id "), "customer_id");
    assert_eq!(normalise_header("city"), "city");
  }
}
