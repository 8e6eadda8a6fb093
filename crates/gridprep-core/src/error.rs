//! Error types for `gridprep-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A pipeline stage was invoked before the ranked snapshot was built.
  #[error("ranked snapshot not built yet; run the snapshot stage first")]
  SnapshotMissing,

  #[error("required table is missing: {0}")]
  TableMissing(String),

  /// The enrichment left join changed the fact-table cardinality.
  #[error("enrichment produced {output} rows from {input} input rows")]
  Cardinality { input: u64, output: u64 },

  #[error("unknown dq_status value: {0:?}")]
  UnknownDqStatus(String),

  #[error("unknown reading kind: {0:?}")]
  UnknownReadingKind(String),

  /// No reference locations are available to draft a coherent customer.
  #[error("no reference locations loaded; cannot draft a customer")]
  NoReferenceLocations,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
