//! Synthetic customer endpoints and the connectivity probe.

use axum::{Json, extract::State};
use serde::Serialize;

use gridprep_core::{
  customer::{CustomerDraft, CustomerRecord, draft_customer},
  store::Warehouse,
};

use crate::{AppState, error::Error};

/// Draft a random customer coherent with the reference cache. Preview only,
/// nothing is inserted.
pub async fn sample<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<CustomerDraft>, Error>
where
  S: Warehouse,
{
  let reference = state.cache.current_or_refresh(state.store.as_ref()).await;
  let draft = draft_customer(&reference, &mut rand::thread_rng())
    .map_err(|_| Error::NoReferenceLocations)?;
  Ok(Json(draft))
}

/// Draft a random customer and insert it; returns the persisted row with
/// its store-assigned id.
pub async fn create<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<CustomerRecord>, Error>
where
  S: Warehouse,
{
  let reference = state.cache.current_or_refresh(state.store.as_ref()).await;
  let draft = draft_customer(&reference, &mut rand::thread_rng())
    .map_err(|_| Error::NoReferenceLocations)?;

  let record = state
    .store
    .insert_customer(draft)
    .await
    .map_err(|e| Error::stage("customer-insert", e))?;

  tracing::info!(customer_id = record.customer_id, "synthetic customer inserted");
  Ok(Json(record))
}

#[derive(Debug, Serialize)]
pub struct Ping {
  pub ok:              bool,
  pub latest_customer: Option<CustomerRecord>,
}

/// Connectivity probe: fetch the most recent customer row.
pub async fn ping<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Ping>, Error>
where
  S: Warehouse,
{
  let latest = state
    .store
    .latest_customer()
    .await
    .map_err(|e| Error::stage("ping", e))?;
  Ok(Json(Ping { ok: true, latest_customer: latest }))
}
