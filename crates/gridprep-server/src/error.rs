//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use gridprep_core::store::StageFailure;

#[derive(Debug, Error)]
pub enum Error {
  /// An upstream pipeline artifact is missing; the hint names the stage to
  /// run first.
  #[error("{hint}")]
  Precondition { stage: &'static str, hint: String },
  /// Destructive endpoint invoked without `confirm=true`.
  #[error("destructive operation requires confirm=true")]
  ConfirmationRequired,
  /// No valid locations available to draft against.
  #[error("no reference locations loaded; load the location dimension first")]
  NoReferenceLocations,
  #[error("{source}")]
  Store {
    stage:  &'static str,
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl Error {
  /// Classify a backend failure for `stage`: reported preconditions map to
  /// 409, everything else is a plain store failure (500).
  pub fn stage<E: StageFailure>(stage: &'static str, e: E) -> Self {
    match e.precondition() {
      Some(hint) => Error::Precondition { stage, hint },
      None       => Error::Store { stage, source: Box::new(e) },
    }
  }

  fn stage_name(&self) -> &'static str {
    match self {
      Error::Precondition { stage, .. } => stage,
      Error::ConfirmationRequired       => "compact",
      Error::NoReferenceLocations       => "customer-draft",
      Error::Store { stage, .. }        => stage,
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      Error::Precondition { .. }    => StatusCode::CONFLICT,
      Error::ConfirmationRequired   => StatusCode::PRECONDITION_FAILED,
      Error::NoReferenceLocations   => StatusCode::CONFLICT,
      Error::Store { .. }           => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let body = json!({
      "stage": self.stage_name(),
      "error": self.to_string(),
    });
    (self.status(), Json(body)).into_response()
  }
}
