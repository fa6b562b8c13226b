//! Orchestration surfaces: graph, pipeline and batch runs.

use std::collections::HashMap;
use std::sync::Arc;

use drover_executor::{ExecutorConfig, ItemDispatcher};
use drover_item::{
  DependencyGraph, ExecutionEvent, ExecutionNotifier, ExecutionResult, NoopNotifier,
  ValidationError, ValueMap, WorkItem, ensure_unique_names,
};
use drover_runner::Runner;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Coordinates whole runs on top of the bounded dispatcher.
///
/// Every entry point validates the request before anything executes; a
/// validation error means no item started, no resources were claimed, and
/// the identical request can be submitted again. Once validation passes the
/// call always resolves with exactly one [`ExecutionResult`] per submitted
/// item, in submission order.
pub struct Orchestrator<R> {
  dispatcher: ItemDispatcher<R>,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl<R: Runner + 'static> Orchestrator<R> {
  /// Create an orchestrator that does not publish execution events.
  pub fn new(runner: Arc<R>, config: ExecutorConfig) -> Self {
    Self::with_notifier(runner, config, Arc::new(NoopNotifier))
  }

  /// Create an orchestrator that publishes execution events to `notifier`.
  pub fn with_notifier(
    runner: Arc<R>,
    config: ExecutorConfig,
    notifier: Arc<dyn ExecutionNotifier>,
  ) -> Self {
    Self {
      dispatcher: ItemDispatcher::new(runner, config, notifier.clone()),
      notifier,
    }
  }

  /// Execute items honoring their declared dependencies.
  ///
  /// The whole graph is validated before anything runs. Execution proceeds
  /// in waves: each wave holds every item whose dependencies have all
  /// succeeded, and runs through the dispatcher under `ceiling`. An item
  /// whose dependency finishes with any non-success outcome is never
  /// started; it resolves to a cancelled result whose detail names the
  /// unmet dependency, and the same applies transitively to its own
  /// dependents.
  #[instrument(name = "run_graph", skip(self, items, cancel), fields(items = items.len(), ceiling))]
  pub async fn run_graph(
    &self,
    items: Vec<WorkItem>,
    ceiling: usize,
    cancel: CancellationToken,
  ) -> Result<Vec<ExecutionResult>, ValidationError> {
    let graph = DependencyGraph::build(&items)?;

    let run_id = new_run_id();
    let run_cancel = cancel.child_token();
    self.run_started(&run_id, items.len());

    let order: Vec<String> = items.iter().map(|i| i.name.clone()).collect();
    let mut pending: HashMap<String, WorkItem> =
      items.into_iter().map(|i| (i.name.clone(), i)).collect();
    let mut finished: HashMap<String, ExecutionResult> = HashMap::new();

    while !pending.is_empty() && !run_cancel.is_cancelled() {
      // A wave is every pending item whose dependencies have all succeeded.
      let mut wave = Vec::new();
      for name in graph.topological_order() {
        if !pending.contains_key(name) {
          continue;
        }
        let deps_ok = graph
          .dependencies_of(name)
          .iter()
          .all(|dep| finished.get(dep).is_some_and(|r| r.is_success()));
        if deps_ok && let Some(item) = pending.remove(name) {
          wave.push(item);
        }
      }
      if wave.is_empty() {
        break;
      }

      info!(run_id = %run_id, wave_items = wave.len(), "wave_started");
      let handle = self
        .dispatcher
        .dispatch(&run_id, wave, ceiling, run_cancel.clone());
      for result in handle.collect().await {
        finished.insert(result.name.clone(), result);
      }
    }

    // Whatever is still pending was blocked by a dependency or overtaken by
    // cancellation. Marking in topological order lets a dependent observe
    // the cancelled result of its own blocked dependency.
    for name in graph.topological_order() {
      let Some(item) = pending.remove(name) else {
        continue;
      };
      let detail = blocked_detail(&item, &finished);
      warn!(run_id = %run_id, item = %item.name, detail = %detail, "item_blocked");
      let result = ExecutionResult::cancelled(&item.name, detail);
      self.notifier.notify(ExecutionEvent::ItemFinished {
        run_id: run_id.clone(),
        item: result.name.clone(),
        outcome: result.outcome,
        attempts: result.attempts,
      });
      finished.insert(result.name.clone(), result);
    }

    let results: Vec<ExecutionResult> = order
      .iter()
      .filter_map(|name| finished.remove(name))
      .collect();
    self.run_finished(&run_id, &results);
    Ok(results)
  }

  /// Execute items one after another, in submission order.
  ///
  /// When `pass_output` is set, each item's input is replaced by the output
  /// of its predecessor before it starts. The pipeline stops at the first
  /// item that does not succeed; that item's result is included, and items
  /// after it are never started and yield no result at all.
  #[instrument(name = "run_pipeline", skip(self, items, cancel), fields(items = items.len(), pass_output))]
  pub async fn run_pipeline(
    &self,
    items: Vec<WorkItem>,
    pass_output: bool,
    cancel: CancellationToken,
  ) -> Result<Vec<ExecutionResult>, ValidationError> {
    ensure_unique_names(&items)?;

    let run_id = new_run_id();
    let run_cancel = cancel.child_token();
    self.run_started(&run_id, items.len());

    let mut results = Vec::with_capacity(items.len());
    let mut carried: Option<ValueMap> = None;

    for mut item in items {
      if pass_output && let Some(output) = carried.take() {
        item.input = output;
      }

      let handle = self
        .dispatcher
        .dispatch(&run_id, vec![item], 1, run_cancel.clone());
      let Some(result) = handle.collect().await.pop() else {
        break;
      };

      let ok = result.is_success();
      if ok {
        carried = Some(result.output.clone());
      }
      results.push(result);
      if !ok {
        break;
      }
    }

    self.run_finished(&run_id, &results);
    Ok(results)
  }

  /// Execute all items concurrently under `ceiling`.
  ///
  /// With `fail_fast`, the first non-success result cancels the rest of the
  /// batch: in-flight items receive the cancellation signal and queued items
  /// never start. Already-finished results are kept as they are. The call
  /// still resolves with one result per item.
  #[instrument(name = "run_batch", skip(self, items, cancel), fields(items = items.len(), ceiling, fail_fast))]
  pub async fn run_batch(
    &self,
    items: Vec<WorkItem>,
    ceiling: usize,
    fail_fast: bool,
    cancel: CancellationToken,
  ) -> Result<Vec<ExecutionResult>, ValidationError> {
    ensure_unique_names(&items)?;

    let run_id = new_run_id();
    let run_cancel = cancel.child_token();
    self.run_started(&run_id, items.len());

    let total = items.len();
    let mut slots: Vec<Option<ExecutionResult>> = (0..total).map(|_| None).collect();
    let mut handle = self
      .dispatcher
      .dispatch(&run_id, items, ceiling, run_cancel.clone());

    while let Some((index, result)) = handle.next().await {
      if fail_fast && !result.is_success() && !run_cancel.is_cancelled() {
        warn!(
          run_id = %run_id,
          item = %result.name,
          outcome = %result.outcome,
          "fail_fast_triggered"
        );
        run_cancel.cancel();
      }
      slots[index] = Some(result);
    }

    let results: Vec<ExecutionResult> = slots.into_iter().flatten().collect();
    self.run_finished(&run_id, &results);
    Ok(results)
  }

  fn run_started(&self, run_id: &str, items: usize) {
    info!(run_id = %run_id, items, "run_started");
    self.notifier.notify(ExecutionEvent::RunStarted {
      run_id: run_id.to_string(),
      items,
    });
  }

  fn run_finished(&self, run_id: &str, results: &[ExecutionResult]) {
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    info!(
      run_id = %run_id,
      succeeded,
      total = results.len(),
      "run_finished"
    );
    self.notifier.notify(ExecutionEvent::RunFinished {
      run_id: run_id.to_string(),
      succeeded,
      total: results.len(),
    });
  }
}

/// Explain why a blocked item never started.
///
/// Dependencies are checked in declared order; the first one that finished
/// without success is named. If none did, the run itself was cancelled.
fn blocked_detail(item: &WorkItem, finished: &HashMap<String, ExecutionResult>) -> String {
  for dep in &item.dependencies {
    if let Some(result) = finished.get(dep)
      && !result.is_success()
    {
      return format!(
        "dependency '{}' finished with outcome {}",
        dep, result.outcome
      );
    }
  }
  "run cancelled before item started".to_string()
}

fn new_run_id() -> String {
  uuid::Uuid::new_v4().to_string()
}
