//! Structured errors carried inside `color_eyre::Report`.
//!
//! Most failures are plain `eyre!` reports. The two types here are the ones
//! callers (and the cache) need to inspect by downcasting.

use color_eyre::Report;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Error codes the backend uses for optimistic-concurrency rejections.
pub const STALE_WRITE_CODES: &[i64] = &[409, 4090];

/// Error payload returned by the backend alongside a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
  #[serde(rename = "errorCode")]
  pub error_code: i64,
  #[serde(default)]
  pub message: String,
}

/// A rejected request to a collection or mutation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{}", describe(.status, .error))]
pub struct ApiError {
  pub status: u16,
  pub error: Option<ErrorBody>,
}

fn describe(status: &u16, body: &Option<ErrorBody>) -> String {
  match body {
    Some(b) if !b.message.is_empty() => {
      format!("request failed with status {} ({}): {}", status, b.error_code, b.message)
    }
    _ => format!("request failed with status {}", status),
  }
}

impl ApiError {
  pub fn new(status: u16) -> Self {
    Self {
      status,
      error: None,
    }
  }

  pub fn with_body(status: u16, error_code: i64, message: impl Into<String>) -> Self {
    Self {
      status,
      error: Some(ErrorBody {
        error_code,
        message: message.into(),
      }),
    }
  }

  pub fn not_found() -> Self {
    Self::new(404)
  }

  pub fn is_not_found(&self) -> bool {
    self.status == 404
  }

  /// Optimistic-concurrency rejection: the entity changed server-side.
  pub fn is_stale_write(&self) -> bool {
    self.status == 409
      || self
        .error
        .as_ref()
        .is_some_and(|b| STALE_WRITE_CODES.contains(&b.error_code))
  }
}

/// A write rejected locally before any request was made.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ValidationError {
  /// Another sibling already uses this position
  #[error("order {orden} is already used by {conflicting_id} within parent {parent}")]
  DuplicateOrder {
    orden: i64,
    parent: i64,
    conflicting_id: i64,
  },

  /// A required field is missing from the payload
  #[error("field '{0}' is required")]
  MissingField(&'static str),
}

/// The `ApiError` inside a report, if any.
pub fn api_error(report: &Report) -> Option<&ApiError> {
  report.downcast_ref::<ApiError>()
}

/// Whether a report carries a 404 from the backend.
pub fn is_not_found(report: &Report) -> bool {
  api_error(report).is_some_and(ApiError::is_not_found)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_not_found_survives_report() {
    let report = Report::new(ApiError::not_found());
    assert!(is_not_found(&report));

    let report = Report::new(ApiError::new(500));
    assert!(!is_not_found(&report));
    assert!(!is_not_found(&color_eyre::eyre::eyre!("transport closed")));
  }

  #[test]
  fn test_stale_write_detection() {
    assert!(ApiError::new(409).is_stale_write());
    assert!(ApiError::with_body(400, 4090, "modified by another user").is_stale_write());
    assert!(!ApiError::with_body(400, 1, "bad input").is_stale_write());
  }

  #[test]
  fn test_display_includes_message() {
    let err = ApiError::with_body(409, 4090, "stale");
    assert_eq!(err.to_string(), "request failed with status 409 (4090): stale");
    assert_eq!(ApiError::new(503).to_string(), "request failed with status 503");
  }
}
