//! Pipeline stage handlers: run, status sync, compaction, duplicate listing.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use gridprep_core::{
  location::RankedLocation,
  store::{EnrichReport, SnapshotReport, Warehouse},
};

use crate::{AppState, error::Error};

/// Combined report for `POST /pipeline/run`.
#[derive(Debug, Serialize)]
pub struct RunReport {
  pub snapshot:   SnapshotReport,
  pub enrichment: EnrichReport,
}

/// Snapshot, clean view, enrichment — in order. The first failing stage
/// aborts the run; earlier stages stay committed (each is its own
/// transaction and is safe to re-invoke).
pub async fn run<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<RunReport>, Error>
where
  S: Warehouse,
{
  let snapshot = state
    .store
    .build_snapshot()
    .await
    .map_err(|e| Error::stage("snapshot", e))?;

  state
    .store
    .ensure_clean_view()
    .await
    .map_err(|e| Error::stage("clean-view", e))?;

  let enrichment = state
    .store
    .enrich_customers()
    .await
    .map_err(|e| Error::stage("enrichment", e))?;

  Ok(Json(RunReport { snapshot, enrichment }))
}

#[derive(Debug, Serialize)]
pub struct SyncReport {
  pub updated: u64,
}

pub async fn sync_status<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<SyncReport>, Error>
where
  S: Warehouse,
{
  let updated = state
    .store
    .sync_status()
    .await
    .map_err(|e| Error::stage("sync-status", e))?;
  Ok(Json(SyncReport { updated }))
}

#[derive(Debug, Deserialize)]
pub struct CompactParams {
  #[serde(default)]
  pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct CompactReport {
  pub deleted: u64,
}

/// Destructive: deletes duplicate dimension rows permanently. Refused
/// without `confirm=true`.
pub async fn compact<S>(
  State(state):  State<AppState<S>>,
  Query(params): Query<CompactParams>,
) -> Result<Json<CompactReport>, Error>
where
  S: Warehouse,
{
  if !params.confirm {
    return Err(Error::ConfirmationRequired);
  }

  let deleted = state
    .store
    .compact_duplicates()
    .await
    .map_err(|e| Error::stage("compact", e))?;
  Ok(Json(CompactReport { deleted }))
}

pub async fn duplicates<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<RankedLocation>>, Error>
where
  S: Warehouse,
{
  let rows = state
    .store
    .list_duplicates()
    .await
    .map_err(|e| Error::stage("duplicates", e))?;
  Ok(Json(rows))
}
