//! Location key back-fill handler.

use axum::{Json, extract::State};
use serde::Serialize;

use gridprep_core::store::Warehouse;

use crate::{AppState, error::Error};

#[derive(Debug, Serialize)]
pub struct KeyReport {
  pub updated: u64,
}

/// Add the `location_key` column to the dimension table if absent and fill
/// it from the state join. Idempotent.
pub async fn backfill_keys<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<KeyReport>, Error>
where
  S: Warehouse,
{
  let updated = state
    .store
    .ensure_location_keys()
    .await
    .map_err(|e| Error::stage("location-keys", e))?;
  Ok(Json(KeyReport { updated }))
}
