//! The `Warehouse` trait and the stage report types.
//!
//! The trait is implemented by storage backends (e.g.
//! `gridprep-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  customer::{CustomerDraft, CustomerRecord, ReferenceData},
  fixtures::{LossDraft, ReadingDraft},
  location::RankedLocation,
};

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Outcome of a snapshot rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotReport {
  pub total:      u64,
  pub valid:      u64,
  pub duplicates: u64,
}

/// Outcome of the enrichment join. `output_rows == input_rows` always holds;
/// a violation is surfaced as an error, never as a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichReport {
  pub input_rows:  u64,
  pub output_rows: u64,
  pub matched:     u64,
  pub unmatched:   u64,
}

/// Outcome of a bulk fixture insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
  pub inserted: u64,
  /// Highest id the store assigned in this batch, if any rows were inserted.
  pub last_id:  Option<i64>,
}

// ─── Error classification ────────────────────────────────────────────────────

/// Classification hook for backend errors, so the HTTP layer can map
/// precondition failures (missing upstream artifact) to a distinct status
/// without knowing the concrete backend.
pub trait StageFailure: std::error::Error + Send + Sync + 'static {
  /// `Some(hint)` when the failure is a reported precondition (the caller
  /// must run an earlier stage first), `None` for store-level failures.
  fn precondition(&self) -> Option<String>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational store the pipeline runs against.
///
/// Stages 4.1/4.4/4.5 and the key back-fill each execute as one
/// all-or-nothing transaction. The snapshot and the enriched artifact are
/// replaced wholesale (build-new then swap) — never partially overwritten.
/// External serialization is assumed: no stage runs concurrently with itself.
pub trait Warehouse: Send + Sync {
  type Error: StageFailure;

  // ── Key back-fill ─────────────────────────────────────────────────────

  /// Ensure the dimension table carries a `location_key` column and fill it
  /// from the state join. Idempotent. Returns rows updated.
  fn ensure_location_keys(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Pipeline stages ───────────────────────────────────────────────────

  /// Ranking engine + status materializer: rebuild the ranked snapshot,
  /// replacing any prior snapshot atomically. Deterministic on stable input.
  fn build_snapshot(
    &self,
  ) -> impl Future<Output = Result<SnapshotReport, Self::Error>> + Send + '_;

  /// Clean-view projector: (re)define the VALID-only view over the
  /// snapshot. Fails with a precondition error if the snapshot is missing.
  fn ensure_clean_view(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Enrichment joiner: left-join the customer fact table against the clean
  /// view and replace the enriched artifact wholesale. Never mutates the
  /// inputs; output cardinality equals input cardinality.
  fn enrich_customers(
    &self,
  ) -> impl Future<Output = Result<EnrichReport, Self::Error>> + Send + '_;

  /// Status synchronizer: back-fill `dq_status` onto the original dimension
  /// table by identity match against the snapshot. Idempotent. Returns rows
  /// updated.
  fn sync_status(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Compactor (destructive): delete every non-surviving duplicate row from
  /// the original dimension table, keyed to physical row identity.
  /// All-or-nothing; a no-op once no duplicates remain. Returns rows
  /// deleted.
  fn compact_duplicates(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Snapshot rows flagged `DUPLICATE_ERROR`, ordered by key then id.
  fn list_duplicates(
    &self,
  ) -> impl Future<Output = Result<Vec<RankedLocation>, Self::Error>> + Send + '_;

  // ── Reference data and generators ─────────────────────────────────────

  /// Load the slowly-changing reference data backing the in-memory cache.
  fn load_reference(
    &self,
  ) -> impl Future<Output = Result<ReferenceData, Self::Error>> + Send + '_;

  /// Insert a drafted customer; the store assigns the id.
  fn insert_customer(
    &self,
    draft: CustomerDraft,
  ) -> impl Future<Output = Result<CustomerRecord, Self::Error>> + Send + '_;

  /// The most recently inserted customer, if any — connectivity probe.
  fn latest_customer(
    &self,
  ) -> impl Future<Output = Result<Option<CustomerRecord>, Self::Error>> + Send + '_;

  /// Bulk-insert a reading batch in one transaction.
  fn insert_readings(
    &self,
    batch: Vec<ReadingDraft>,
  ) -> impl Future<Output = Result<BatchReport, Self::Error>> + Send + '_;

  /// Bulk-insert a loss batch in one transaction.
  fn insert_losses(
    &self,
    batch: Vec<LossDraft>,
  ) -> impl Future<Output = Result<BatchReport, Self::Error>> + Send + '_;
}
