use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use drover_item::{ValueMap, WorkItem};

/// Ways a single run can end without output.
///
/// The variants map one to one onto the non-success terminal outcomes; the
/// layers above never see anything richer than this from a runner.
#[derive(Debug, Error)]
pub enum RunnerError {
  /// The run observed the cancellation signal and stopped.
  #[error("cancelled before completion")]
  Cancelled,

  /// The runner enforced its own deadline.
  #[error("timed out after {after:?}")]
  TimedOut { after: Duration },

  /// The work itself failed.
  #[error("{message}")]
  Failed { message: String },
}

impl RunnerError {
  pub fn failed(message: impl Into<String>) -> Self {
    RunnerError::Failed {
      message: message.into(),
    }
  }
}

/// Executes one work item.
///
/// Implementations read the item's name, input and timeout and perform the
/// actual work. They must watch `cancel` and return
/// [`RunnerError::Cancelled`] promptly when it fires; runners that cannot be
/// interrupted are force-abandoned by the executor after a grace period.
#[async_trait]
pub trait Runner: Send + Sync {
  async fn run(&self, item: &WorkItem, cancel: CancellationToken) -> Result<ValueMap, RunnerError>;
}
