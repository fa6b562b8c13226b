use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::item::ValueMap;

/// Terminal state of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  /// The runner completed and returned output.
  Success,
  /// The runner reported an error, or panicked.
  Failed,
  /// An attempt exceeded its deadline.
  TimedOut,
  /// The item was cancelled before or during execution.
  Cancelled,
}

impl Outcome {
  pub fn is_success(&self) -> bool {
    matches!(self, Outcome::Success)
  }
}

impl std::fmt::Display for Outcome {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Outcome::Success => "success",
      Outcome::Failed => "failed",
      Outcome::TimedOut => "timed_out",
      Outcome::Cancelled => "cancelled",
    };
    f.write_str(s)
  }
}

/// The record produced for every submitted work item.
///
/// A request always yields exactly one result per item, whatever happened to
/// it. `output` is only meaningful when `outcome` is [`Outcome::Success`];
/// `error_detail` is present for every non-success outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
  pub name: String,
  pub outcome: Outcome,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  /// Attempts actually made. Zero when the item never started (cancelled
  /// while queued, or blocked by a failed dependency).
  pub attempts: u32,
  #[serde(default)]
  pub output: ValueMap,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_detail: Option<String>,
}

impl ExecutionResult {
  /// Record for an item that was never started.
  pub fn cancelled(name: impl Into<String>, detail: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      name: name.into(),
      outcome: Outcome::Cancelled,
      started_at: now,
      finished_at: now,
      attempts: 0,
      output: ValueMap::new(),
      error_detail: Some(detail.into()),
    }
  }

  pub fn is_success(&self) -> bool {
    self.outcome.is_success()
  }

  /// Wall time between start and finish.
  pub fn duration(&self) -> chrono::Duration {
    self.finished_at - self.started_at
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn outcome_serializes_snake_case() {
    let json = serde_json::to_string(&Outcome::TimedOut).unwrap();
    assert_eq!(json, "\"timed_out\"");
  }

  #[test]
  fn cancelled_result_has_zero_attempts() {
    let result = ExecutionResult::cancelled("a", "cancelled before start");
    assert_eq!(result.outcome, Outcome::Cancelled);
    assert_eq!(result.attempts, 0);
    assert_eq!(result.error_detail.as_deref(), Some("cancelled before start"));
    assert!(result.output.is_empty());
  }

  #[test]
  fn outcome_display_matches_wire_format() {
    for outcome in [
      Outcome::Success,
      Outcome::Failed,
      Outcome::TimedOut,
      Outcome::Cancelled,
    ] {
      let wire = serde_json::to_string(&outcome).unwrap();
      assert_eq!(wire, format!("\"{}\"", outcome));
    }
  }
}
