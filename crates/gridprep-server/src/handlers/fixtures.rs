//! Fixture batch handlers — expand a fixed plan and bulk-insert it.

use axum::{Json, extract::State};

use gridprep_core::{
  fixtures::{LossPlan, ReadingPlan},
  store::{BatchReport, Warehouse},
};

use crate::{AppState, error::Error};

/// Normal readings: customers 1001–1050, Feb–Oct, 600–3000 kWh.
pub async fn readings<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<BatchReport>, Error>
where
  S: Warehouse,
{
  insert_reading_plan(&state, ReadingPlan::normal_feb_oct()).await
}

/// Estimated readings: customers 1001–1050, Nov–Dec, 400–2000 kWh.
pub async fn readings_estimated<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<BatchReport>, Error>
where
  S: Warehouse,
{
  insert_reading_plan(&state, ReadingPlan::estimated_nov_dec()).await
}

/// Losses: BA/SP/MG, Jan–Jul, one row per state per month.
pub async fn losses<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<BatchReport>, Error>
where
  S: Warehouse,
{
  let batch = LossPlan::jan_jul().generate(&mut rand::thread_rng());
  let report = state
    .store
    .insert_losses(batch)
    .await
    .map_err(|e| Error::stage("fixtures-losses", e))?;
  Ok(Json(report))
}

async fn insert_reading_plan<S>(
  state: &AppState<S>,
  plan:  ReadingPlan,
) -> Result<Json<BatchReport>, Error>
where
  S: Warehouse,
{
  let batch = plan.generate(&mut rand::thread_rng());
  let report = state
    .store
    .insert_readings(batch)
    .await
    .map_err(|e| Error::stage("fixtures-readings", e))?;
  Ok(Json(report))
}
