//! Dependency-graph runs: waves, blocking, validation and cancellation.

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

fn item(name: &str, deps: &[&str]) -> WorkItem {
  WorkItem::new(name).with_dependencies(deps.iter().map(|d| d.to_string()).collect())
}

#[tokio::test]
async fn diamond_runs_in_waves() {
  let runner = Arc::new(ScriptedRunner::new());
  let items = vec![
    item("a", &[]),
    item("b", &["a"]),
    item("c", &["a"]),
    item("d", &["b", "c"]),
  ];

  let results = orchestrator(runner.clone())
    .run_graph(items, 4, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(results.len(), 4);
  assert!(results.iter().all(|r| r.outcome == Outcome::Success));
  let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
  assert_eq!(names, vec!["a", "b", "c", "d"]);

  // Dependencies run strictly before their dependents.
  let started = runner.started();
  assert_eq!(started.first().map(String::as_str), Some("a"));
  assert_eq!(started.last().map(String::as_str), Some("d"));
}

#[tokio::test]
async fn failed_dependency_blocks_its_dependents() {
  let runner = Arc::new(
    ScriptedRunner::new().script("a", Script::Fail("disk full".into())),
  );
  let items = vec![item("a", &[]), item("b", &["a"]), item("c", &["a"])];

  let results = orchestrator(runner.clone())
    .run_graph(items, 4, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(results.len(), 3);
  assert_eq!(results[0].outcome, Outcome::Failed);
  for blocked in &results[1..] {
    assert_eq!(blocked.outcome, Outcome::Cancelled);
    assert_eq!(blocked.attempts, 0);
    let detail = blocked.error_detail.as_deref().unwrap();
    assert!(detail.contains("'a'"), "detail was: {detail}");
  }
  assert_eq!(runner.started(), vec!["a".to_string()]);
}

#[tokio::test]
async fn blocking_propagates_through_the_chain() {
  let runner = Arc::new(ScriptedRunner::new().script("a", Script::Fail("boom".into())));
  let items = vec![
    WorkItem::new("a"),
    WorkItem::new("b").depends_on("a"),
    WorkItem::new("c").depends_on("b"),
  ];

  let results = orchestrator(runner.clone())
    .run_graph(items, 2, CancellationToken::new())
    .await
    .unwrap();

  // Each blocked item names its own direct dependency.
  assert_eq!(
    results[1].error_detail.as_deref(),
    Some("dependency 'a' finished with outcome failed")
  );
  assert_eq!(
    results[2].error_detail.as_deref(),
    Some("dependency 'b' finished with outcome cancelled")
  );
}

#[tokio::test]
async fn timed_out_dependency_blocks_dependents() {
  let runner = Arc::new(ScriptedRunner::new().script(
    "a",
    Script::Delay {
      delay: Duration::from_secs(5),
      output: ValueMap::new(),
    },
  ));
  let items = vec![
    item("a", &[]).with_timeout(Duration::from_millis(25)),
    item("b", &["a"]),
  ];

  let results = orchestrator(runner.clone())
    .run_graph(items, 2, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(results[0].outcome, Outcome::TimedOut);
  assert_eq!(results[1].outcome, Outcome::Cancelled);
  assert_eq!(
    results[1].error_detail.as_deref(),
    Some("dependency 'a' finished with outcome timed_out")
  );
}

#[tokio::test]
async fn cycle_is_rejected_before_anything_runs() {
  let runner = Arc::new(ScriptedRunner::new());
  let items = vec![item("a", &["b"]), item("b", &["a"]), item("c", &[])];

  let orchestrator = orchestrator(runner.clone());
  let error = orchestrator
    .run_graph(items.clone(), 2, CancellationToken::new())
    .await
    .unwrap_err();

  match error {
    ValidationError::DependencyCycle { involved } => {
      assert_eq!(involved, vec!["a".to_string(), "b".to_string()]);
    }
    other => panic!("expected cycle error, got {other:?}"),
  }

  // Rejection is idempotent: the same request fails the same way, and no
  // item ever started.
  let again = orchestrator
    .run_graph(items, 2, CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(again, ValidationError::DependencyCycle { .. }));
  assert!(runner.started().is_empty());
}

#[tokio::test]
async fn unknown_dependency_is_rejected() {
  let runner = Arc::new(ScriptedRunner::new());
  let items = vec![item("a", &[]), item("b", &["missing"])];

  let error = orchestrator(runner.clone())
    .run_graph(items, 2, CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(
    error,
    ValidationError::UnknownDependency { ref item, ref dependency }
      if item == "b" && dependency == "missing"
  ));
  assert!(runner.started().is_empty());
}

#[tokio::test]
async fn duplicate_names_are_rejected() {
  let runner = Arc::new(ScriptedRunner::new());
  let items = vec![item("a", &[]), item("a", &[])];

  let error = orchestrator(runner)
    .run_graph(items, 2, CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(error, ValidationError::DuplicateName { ref name } if name == "a"));
}

#[tokio::test]
async fn ceiling_throttles_wave_width() {
  let mut runner = ScriptedRunner::new();
  let mut items = Vec::new();
  for i in 0..6 {
    let name = format!("item-{i}");
    runner = runner.script(
      name.clone(),
      Script::Delay {
        delay: Duration::from_millis(40),
        output: ValueMap::new(),
      },
    );
    items.push(item(&name, &[]));
  }
  let runner = Arc::new(runner);

  let results = orchestrator(runner.clone())
    .run_graph(items, 2, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(results.len(), 6);
  assert!(
    runner.peak_in_flight() <= 2,
    "peak was {}",
    runner.peak_in_flight()
  );
}

#[tokio::test]
async fn retries_happen_inside_the_graph() {
  let runner = Arc::new(ScriptedRunner::new().script(
    "a",
    Script::FailTimes {
      failures: 2,
      output: output("ready", true),
    },
  ));
  let items = vec![
    item("a", &[]).with_retry_budget(3),
    item("b", &["a"]),
  ];

  let results = orchestrator(runner.clone())
    .run_graph(items, 2, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(results[0].outcome, Outcome::Success);
  assert_eq!(results[0].attempts, 3);
  assert_eq!(results[1].outcome, Outcome::Success);
}

#[tokio::test]
async fn cancellation_stops_future_waves() {
  let runner = Arc::new(
    ScriptedRunner::new()
      .script(
        "a",
        Script::Delay {
          delay: Duration::from_millis(100),
          output: ValueMap::new(),
        },
      )
      .script(
        "b",
        Script::Delay {
          delay: Duration::from_millis(100),
          output: ValueMap::new(),
        },
      ),
  );
  let items = vec![item("a", &[]), item("b", &["a"])];

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    trigger.cancel();
  });

  let results = orchestrator(runner.clone())
    .run_graph(items, 2, cancel)
    .await
    .unwrap();

  assert_eq!(results.len(), 2);
  assert_eq!(results[0].outcome, Outcome::Cancelled);
  assert_eq!(results[1].outcome, Outcome::Cancelled);
  // The second wave never started.
  assert_eq!(results[1].attempts, 0);
  assert_eq!(runner.started(), vec!["a".to_string()]);
}

#[tokio::test]
async fn results_come_back_in_submission_order() {
  let runner = Arc::new(ScriptedRunner::new());
  let items = vec![
    item("d", &["c"]),
    item("c", &["b"]),
    item("b", &["a"]),
    item("a", &[]),
  ];

  let results = orchestrator(runner.clone())
    .run_graph(items, 2, CancellationToken::new())
    .await
    .unwrap();

  let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
  assert_eq!(names, vec!["d", "c", "b", "a"]);
  assert_eq!(runner.started(), vec!["a", "b", "c", "d"]);
}
