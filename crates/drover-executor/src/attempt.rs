use std::time::Duration;

use tokio_util::sync::CancellationToken;

use drover_item::{Outcome, ValueMap, WorkItem};
use drover_runner::{Runner, RunnerError};

/// What a single attempt produced.
#[derive(Debug)]
pub(crate) struct AttemptReport {
  pub outcome: Outcome,
  pub output: ValueMap,
  pub error: Option<String>,
}

impl AttemptReport {
  fn success(output: ValueMap) -> Self {
    Self {
      outcome: Outcome::Success,
      output,
      error: None,
    }
  }

  fn from_error(error: RunnerError) -> Self {
    let outcome = match &error {
      RunnerError::Cancelled => Outcome::Cancelled,
      RunnerError::TimedOut { .. } => Outcome::TimedOut,
      RunnerError::Failed { .. } => Outcome::Failed,
    };
    Self {
      outcome,
      output: ValueMap::new(),
      error: Some(error.to_string()),
    }
  }

  fn timed_out(after: Duration) -> Self {
    Self {
      outcome: Outcome::TimedOut,
      output: ValueMap::new(),
      error: Some(format!("timed out after {after:?}")),
    }
  }

  fn forced_cancel(grace: Duration) -> Self {
    Self {
      outcome: Outcome::Cancelled,
      output: ValueMap::new(),
      error: Some(format!(
        "cancelled; runner did not stop within the {grace:?} grace period and was abandoned"
      )),
    }
  }
}

/// Run one attempt under the item deadline and the request cancellation
/// signal.
///
/// The runner gets a child token, so a deadline can interrupt this attempt
/// without touching anything else in the request. When the deadline fires
/// the attempt is reported timed out right away; the interrupt signal is
/// best effort. When the request is cancelled the runner gets `grace` to
/// wind down and its natural result stands if it arrives in time; otherwise
/// the attempt is force-marked cancelled and the runner abandoned.
pub(crate) async fn run_attempt<R: Runner + ?Sized>(
  runner: &R,
  item: &WorkItem,
  cancel: &CancellationToken,
  grace: Duration,
) -> AttemptReport {
  let attempt_cancel = cancel.child_token();
  let fut = runner.run(item, attempt_cancel.clone());
  tokio::pin!(fut);

  tokio::select! {
    result = &mut fut => match result {
      Ok(output) => AttemptReport::success(output),
      Err(error) => AttemptReport::from_error(error),
    },
    after = deadline_elapsed(item.timeout) => {
      attempt_cancel.cancel();
      AttemptReport::timed_out(after)
    }
    _ = cancel.cancelled() => {
      // The child token is already cancelled through the parent; give the
      // runner a bounded window to come back on its own.
      match tokio::time::timeout(grace, &mut fut).await {
        Ok(Ok(output)) => AttemptReport::success(output),
        Ok(Err(error)) => AttemptReport::from_error(error),
        Err(_) => AttemptReport::forced_cancel(grace),
      }
    }
  }
}

async fn deadline_elapsed(timeout: Option<Duration>) -> Duration {
  match timeout {
    Some(after) => {
      tokio::time::sleep(after).await;
      after
    }
    None => std::future::pending().await,
  }
}
