use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use drover_item::{ExecutionEvent, ExecutionNotifier, ExecutionResult, Outcome, WorkItem};
use drover_runner::Runner;

use crate::attempt::run_attempt;
use crate::config::ExecutorConfig;

/// Execute one item to a terminal outcome, retrying failed and timed-out
/// attempts within the item's retry budget.
///
/// Success and cancellation are terminal. Once cancellation has been
/// observed no further attempt starts, and the last attempt's own outcome is
/// what gets reported. The result carries the number of attempts actually
/// made and spans from the first attempt's start to the terminal instant.
pub async fn execute_item<R: Runner + ?Sized>(
  runner: &R,
  run_id: &str,
  item: &WorkItem,
  config: &ExecutorConfig,
  cancel: &CancellationToken,
  notifier: &dyn ExecutionNotifier,
) -> ExecutionResult {
  let started_at = Utc::now();
  let mut attempt = 0u32;

  let report = loop {
    attempt += 1;
    let report = run_attempt(runner, item, cancel, config.grace_period).await;

    match report.outcome {
      Outcome::Success | Outcome::Cancelled => break report,
      Outcome::Failed | Outcome::TimedOut => {
        if attempt > item.retry_budget || cancel.is_cancelled() {
          break report;
        }

        let delay = config.backoff.delay_for(attempt);
        notifier.notify(ExecutionEvent::ItemRetrying {
          run_id: run_id.to_string(),
          item: item.name.clone(),
          next_attempt: attempt + 1,
          error: report.error.clone().unwrap_or_default(),
        });
        warn!(
          item = %item.name,
          attempt,
          delay_ms = delay.as_millis() as u64,
          "item_retrying"
        );

        tokio::select! {
          _ = tokio::time::sleep(delay) => {}
          // Cancelled mid-backoff: stop retrying, keep the attempt's own
          // outcome.
          _ = cancel.cancelled() => break report,
        }
      }
    }
  };

  ExecutionResult {
    name: item.name.clone(),
    outcome: report.outcome,
    started_at,
    finished_at: Utc::now(),
    attempts: attempt,
    output: report.output,
    error_detail: report.error,
  }
}
