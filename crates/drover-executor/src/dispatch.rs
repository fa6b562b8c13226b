//! Bounded dispatcher.
//!
//! A fixed pool of worker tasks drains a shared FIFO queue, so at most
//! `ceiling` items run at once and admission follows submission order.
//! Results stream back over a channel as items finish; every submitted item
//! yields exactly one result.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use drover_item::{
  ExecutionEvent, ExecutionNotifier, ExecutionResult, Outcome, ValueMap, WorkItem,
};
use drover_runner::Runner;

use crate::config::ExecutorConfig;
use crate::retry::execute_item;

/// Runs items through the retry pipeline under a concurrency ceiling.
pub struct ItemDispatcher<R> {
  runner: Arc<R>,
  config: Arc<ExecutorConfig>,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl<R: Runner + 'static> ItemDispatcher<R> {
  pub fn new(runner: Arc<R>, config: ExecutorConfig, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    Self {
      runner,
      config: Arc::new(config),
      notifier,
    }
  }

  /// Submit a set of items for execution.
  ///
  /// A ceiling of zero is treated as one. Items queued behind the ceiling
  /// observe cancellation before they start and resolve to cancelled results
  /// without ever running.
  pub fn dispatch(
    &self,
    run_id: &str,
    items: Vec<WorkItem>,
    ceiling: usize,
    cancel: CancellationToken,
  ) -> DispatchHandle {
    let total = items.len();
    let queue: Arc<Mutex<VecDeque<(usize, WorkItem)>>> =
      Arc::new(Mutex::new(items.into_iter().enumerate().collect()));
    let (tx, rx) = mpsc::unbounded_channel();

    let workers = ceiling.max(1).min(total.max(1));
    for _ in 0..workers {
      let queue = queue.clone();
      let tx = tx.clone();
      let runner = self.runner.clone();
      let config = self.config.clone();
      let notifier = self.notifier.clone();
      let cancel = cancel.clone();
      let run_id = run_id.to_string();

      tokio::spawn(async move {
        loop {
          let next = queue.lock().await.pop_front();
          let Some((index, item)) = next else { break };

          let result = if cancel.is_cancelled() {
            ExecutionResult::cancelled(&item.name, "cancelled before start")
          } else {
            notifier.notify(ExecutionEvent::ItemStarted {
              run_id: run_id.clone(),
              item: item.name.clone(),
            });
            info!(run_id = %run_id, item = %item.name, "item_started");
            run_isolated(&runner, &run_id, item, &config, &cancel, &notifier).await
          };

          notifier.notify(ExecutionEvent::ItemFinished {
            run_id: run_id.clone(),
            item: result.name.clone(),
            outcome: result.outcome,
            attempts: result.attempts,
          });
          info!(
            run_id = %run_id,
            item = %result.name,
            outcome = %result.outcome,
            attempts = result.attempts,
            "item_finished"
          );

          if tx.send((index, result)).is_err() {
            break;
          }
        }
      });
    }

    DispatchHandle {
      rx,
      total,
      remaining: total,
    }
  }
}

/// Run one item on its own task so a panicking runner fails only its item.
async fn run_isolated<R: Runner + 'static>(
  runner: &Arc<R>,
  run_id: &str,
  item: WorkItem,
  config: &Arc<ExecutorConfig>,
  cancel: &CancellationToken,
  notifier: &Arc<dyn ExecutionNotifier>,
) -> ExecutionResult {
  let name = item.name.clone();
  let begin = Utc::now();

  let task = {
    let runner = runner.clone();
    let config = config.clone();
    let cancel = cancel.clone();
    let notifier = notifier.clone();
    let run_id = run_id.to_string();
    tokio::spawn(async move {
      execute_item(
        runner.as_ref(),
        &run_id,
        &item,
        &config,
        &cancel,
        notifier.as_ref(),
      )
      .await
    })
  };

  match task.await {
    Ok(result) => result,
    Err(join_error) => {
      let detail = if join_error.is_panic() {
        format!("runner panicked: {join_error}")
      } else {
        "runner task aborted".to_string()
      };
      ExecutionResult {
        name,
        outcome: Outcome::Failed,
        started_at: begin,
        finished_at: Utc::now(),
        attempts: 1,
        output: ValueMap::new(),
        error_detail: Some(detail),
      }
    }
  }
}

/// Streaming view over the results of one dispatch call.
pub struct DispatchHandle {
  rx: mpsc::UnboundedReceiver<(usize, ExecutionResult)>,
  total: usize,
  remaining: usize,
}

impl DispatchHandle {
  /// Next finished item as `(submission index, result)`, in completion
  /// order. Returns `None` once every submitted item has been yielded.
  pub async fn next(&mut self) -> Option<(usize, ExecutionResult)> {
    if self.remaining == 0 {
      return None;
    }
    let next = self.rx.recv().await;
    if next.is_some() {
      self.remaining -= 1;
    }
    next
  }

  /// Await the outstanding results and return them in submission order.
  pub async fn collect(mut self) -> Vec<ExecutionResult> {
    let mut slots: Vec<Option<ExecutionResult>> = Vec::new();
    slots.resize_with(self.total, || None);
    while let Some((index, result)) = self.next().await {
      if let Some(slot) = slots.get_mut(index) {
        *slot = Some(result);
      }
    }
    slots.into_iter().flatten().collect()
  }

  /// Number of results not yet yielded.
  pub fn remaining(&self) -> usize {
    self.remaining
  }
}
