//! HTTP surface for the Gridprep location pipeline.
//!
//! Exposes an axum [`Router`] generic over any [`Warehouse`] backend, plus
//! the server configuration and the reference-data cache.

pub mod cache;
pub mod error;
pub mod handlers;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use gridprep_core::store::Warehouse;

use cache::ReferenceCache;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:    String,
  pub port:    u16,
  pub db_path: PathBuf,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: Warehouse> {
  pub store:  Arc<S>,
  pub cache:  Arc<ReferenceCache>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the pipeline service.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: Warehouse + Clone + 'static,
{
  Router::new()
    .route("/",                            get(index))
    .route("/locations/keys",              post(handlers::locations::backfill_keys::<S>))
    .route("/pipeline/run",                post(handlers::pipeline::run::<S>))
    .route("/pipeline/sync-status",        post(handlers::pipeline::sync_status::<S>))
    .route("/pipeline/compact",            post(handlers::pipeline::compact::<S>))
    .route("/pipeline/duplicates",         get(handlers::pipeline::duplicates::<S>))
    .route("/customers/sample",            get(handlers::customers::sample::<S>))
    .route("/customers",                   post(handlers::customers::create::<S>))
    .route("/db/ping",                     get(handlers::customers::ping::<S>))
    .route("/fixtures/readings",           post(handlers::fixtures::readings::<S>))
    .route("/fixtures/readings/estimated", post(handlers::fixtures::readings_estimated::<S>))
    .route("/fixtures/losses",             post(handlers::fixtures::losses::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// GET / — route index.
async fn index() -> Json<serde_json::Value> {
  Json(serde_json::json!({
    "service": "gridprep",
    "routes": [
      "POST /locations/keys",
      "POST /pipeline/run",
      "POST /pipeline/sync-status",
      "POST /pipeline/compact?confirm=true",
      "GET  /pipeline/duplicates",
      "GET  /customers/sample",
      "POST /customers",
      "GET  /db/ping",
      "POST /fixtures/readings",
      "POST /fixtures/readings/estimated",
      "POST /fixtures/losses",
    ],
  }))
}

// ─── Integration tests ────────────────────────────────────────────────────────
