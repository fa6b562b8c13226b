//! Concurrent batches: natural outcomes, fail-fast and bounded ceilings.

use std::sync::Arc;
use std::time::Duration;

use drover_item::{Outcome, ValidationError, ValueMap, WorkItem};
use drover_orchestrator::{BackoffPolicy, ExecutorConfig, Orchestrator};
use drover_runner::testing::{Script, ScriptedRunner, output};
use tokio_util::sync::CancellationToken;

fn orchestrator(runner: Arc<ScriptedRunner>) -> Orchestrator<ScriptedRunner> {
  let config = ExecutorConfig {
    backoff: BackoffPolicy {
      base: Duration::from_millis(5),
      multiplier: 1.0,
      max: Duration::from_millis(5),
    },
    grace_period: Duration::from_millis(200),
  };
  Orchestrator::new(runner, config)
}

fn slow(millis: u64) -> Script {
  Script::Delay {
    delay: Duration::from_millis(millis),
    output: ValueMap::new(),
  }
}

#[tokio::test]
async fn collects_natural_outcomes_without_fail_fast() {
  let runner = Arc::new(
    ScriptedRunner::new()
      .script("ok", Script::Succeed(output("done", true)))
      .script("broken", Script::Fail("no such host".into()))
      .script("slow", slow(30)),
  );
  let items = vec![
    WorkItem::new("ok"),
    WorkItem::new("broken"),
    WorkItem::new("slow"),
  ];

  let results = orchestrator(runner)
    .run_batch(items, 3, false, CancellationToken::new())
    .await
    .unwrap();

  // One result per item, in submission order, each with its own outcome.
  assert_eq!(results.len(), 3);
  assert_eq!(results[0].name, "ok");
  assert_eq!(results[0].outcome, Outcome::Success);
  assert_eq!(results[1].name, "broken");
  assert_eq!(results[1].outcome, Outcome::Failed);
  assert_eq!(results[2].name, "slow");
  assert_eq!(results[2].outcome, Outcome::Success);
}

#[tokio::test]
async fn one_failure_never_forces_anothers_outcome() {
  let runner = Arc::new(
    ScriptedRunner::new()
      .script("broken", Script::Fail("boom".into()))
      .script("steady", slow(50)),
  );
  let items = vec![WorkItem::new("broken"), WorkItem::new("steady")];

  let results = orchestrator(runner)
    .run_batch(items, 2, false, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(results[0].outcome, Outcome::Failed);
  assert_eq!(results[1].outcome, Outcome::Success);
}

#[tokio::test]
async fn fail_fast_cancels_the_rest_of_the_batch() {
  let runner = Arc::new(
    ScriptedRunner::new()
      .script("boom", Script::Fail("bad credentials".into()))
      .script("in-flight", slow(5_000))
      .script("queued", slow(5_000)),
  );
  let items = vec![
    WorkItem::new("in-flight"),
    WorkItem::new("boom"),
    WorkItem::new("queued"),
  ];

  let cancel = CancellationToken::new();
  let results = tokio::time::timeout(
    Duration::from_secs(2),
    orchestrator(runner).run_batch(items, 2, true, cancel.clone()),
  )
  .await
  .expect("batch must not hang")
  .unwrap();

  assert_eq!(results.len(), 3);
  assert_eq!(results[0].outcome, Outcome::Cancelled);
  assert_eq!(results[1].outcome, Outcome::Failed);
  assert_eq!(results[2].outcome, Outcome::Cancelled);
  // Cancellation is scoped to this call; the caller's token is untouched.
  assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn fail_fast_abandons_a_stalled_runner_after_the_grace_period() {
  let runner = Arc::new(
    ScriptedRunner::new()
      .script("boom", Script::Fail("boom".into()))
      .script("stuck", Script::Stall),
  );
  let items = vec![WorkItem::new("boom"), WorkItem::new("stuck")];

  let results = tokio::time::timeout(
    Duration::from_secs(2),
    orchestrator(runner).run_batch(items, 2, true, CancellationToken::new()),
  )
  .await
  .expect("batch must not hang")
  .unwrap();

  assert_eq!(results[1].name, "stuck");
  assert_eq!(results[1].outcome, Outcome::Cancelled);
  let detail = results[1].error_detail.as_deref().unwrap();
  assert!(detail.contains("grace period"), "detail was: {detail}");
}

#[tokio::test]
async fn all_successes_make_fail_fast_a_no_op() {
  let runner = Arc::new(ScriptedRunner::new());
  let items = vec![
    WorkItem::new("a"),
    WorkItem::new("b"),
    WorkItem::new("c"),
  ];

  let results = orchestrator(runner)
    .run_batch(items, 2, true, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(results.len(), 3);
  assert!(results.iter().all(|r| r.outcome == Outcome::Success));
}

#[tokio::test]
async fn ceiling_bounds_batch_concurrency() {
  let mut runner = ScriptedRunner::new();
  let mut items = Vec::new();
  for i in 0..6 {
    let name = format!("item-{i}");
    runner = runner.script(name.clone(), slow(40));
    items.push(WorkItem::new(name));
  }
  let runner = Arc::new(runner);

  orchestrator(runner.clone())
    .run_batch(items, 2, false, CancellationToken::new())
    .await
    .unwrap();

  assert!(
    runner.peak_in_flight() <= 2,
    "peak was {}",
    runner.peak_in_flight()
  );
}

#[tokio::test]
async fn external_cancellation_resolves_every_item() {
  let mut runner = ScriptedRunner::new();
  let mut items = Vec::new();
  for name in ["a", "b", "c"] {
    runner = runner.script(name, slow(5_000));
    items.push(WorkItem::new(name));
  }
  let runner = Arc::new(runner);

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    trigger.cancel();
  });

  let results = tokio::time::timeout(
    Duration::from_secs(2),
    orchestrator(runner).run_batch(items, 3, false, cancel),
  )
  .await
  .expect("batch must not hang")
  .unwrap();

  assert_eq!(results.len(), 3);
  assert!(results.iter().all(|r| r.outcome == Outcome::Cancelled));
}

#[tokio::test]
async fn duplicate_names_are_rejected() {
  let runner = Arc::new(ScriptedRunner::new());
  let items = vec![WorkItem::new("a"), WorkItem::new("a")];

  let error = orchestrator(runner.clone())
    .run_batch(items, 2, false, CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(error, ValidationError::DuplicateName { ref name } if name == "a"));
  assert!(runner.started().is_empty());
}
