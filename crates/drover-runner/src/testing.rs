//! Scripted runners for exercising the execution pipeline in tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use drover_item::{ValueMap, WorkItem};

use crate::runner::{Runner, RunnerError};

/// Behavior of [`ScriptedRunner`] for one item name.
#[derive(Debug, Clone)]
pub enum Script {
  /// Return the given output immediately.
  Succeed(ValueMap),
  /// Fail with the given message on every attempt.
  Fail(String),
  /// Fail the first `failures` attempts, then return the output.
  FailTimes { failures: u32, output: ValueMap },
  /// Sleep (honoring cancellation), then return the output.
  Delay { delay: Duration, output: ValueMap },
  /// Sleep on the first `slow_attempts` attempts, then answer instantly.
  /// Paired with an item timeout this produces timed-out attempts followed
  /// by a fast success.
  SlowStart {
    slow_attempts: u32,
    delay: Duration,
    output: ValueMap,
  },
  /// Ignore cancellation but still finish after the delay.
  Finishing { delay: Duration, output: ValueMap },
  /// Block until cancelled, then acknowledge the cancellation.
  Hang,
  /// Block forever and ignore cancellation entirely.
  Stall,
  /// Panic, as a buggy runner would.
  Panic,
}

/// In-memory runner driven by per-item scripts.
///
/// Items without a script succeed immediately with empty output. The runner
/// records attempt counts, admission order and concurrent in-flight peaks so
/// tests can assert on scheduling behavior.
pub struct ScriptedRunner {
  scripts: HashMap<String, Script>,
  attempts: Mutex<HashMap<String, u32>>,
  started: Mutex<Vec<String>>,
  inputs: Mutex<HashMap<String, ValueMap>>,
  in_flight: AtomicUsize,
  peak_in_flight: AtomicUsize,
}

impl ScriptedRunner {
  pub fn new() -> Self {
    Self {
      scripts: HashMap::new(),
      attempts: Mutex::new(HashMap::new()),
      started: Mutex::new(Vec::new()),
      inputs: Mutex::new(HashMap::new()),
      in_flight: AtomicUsize::new(0),
      peak_in_flight: AtomicUsize::new(0),
    }
  }

  /// Assign a script to an item name.
  pub fn script(mut self, name: impl Into<String>, script: Script) -> Self {
    self.scripts.insert(name.into(), script);
    self
  }

  /// Attempts made so far for the given item.
  pub fn attempts(&self, name: &str) -> u32 {
    self
      .attempts
      .lock()
      .expect("lock poisoned")
      .get(name)
      .copied()
      .unwrap_or(0)
  }

  /// Item names in the order their first attempt started.
  pub fn started(&self) -> Vec<String> {
    self.started.lock().expect("lock poisoned").clone()
  }

  /// Input the given item was last invoked with.
  pub fn input_of(&self, name: &str) -> Option<ValueMap> {
    self.inputs.lock().expect("lock poisoned").get(name).cloned()
  }

  /// Highest number of concurrently running attempts observed.
  pub fn peak_in_flight(&self) -> usize {
    self.peak_in_flight.load(Ordering::SeqCst)
  }

  fn enter(&self) -> InFlight<'_> {
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    InFlight { runner: self }
  }
}

impl Default for ScriptedRunner {
  fn default() -> Self {
    Self::new()
  }
}

/// Decrements the in-flight counter even when the attempt future is dropped.
struct InFlight<'a> {
  runner: &'a ScriptedRunner,
}

impl Drop for InFlight<'_> {
  fn drop(&mut self) {
    self.runner.in_flight.fetch_sub(1, Ordering::SeqCst);
  }
}

/// Convenience for building a one-entry output map.
pub fn output(key: &str, value: impl Into<serde_json::Value>) -> ValueMap {
  let mut map = ValueMap::new();
  map.insert(key.to_string(), value.into());
  map
}

#[async_trait]
impl Runner for ScriptedRunner {
  async fn run(&self, item: &WorkItem, cancel: CancellationToken) -> Result<ValueMap, RunnerError> {
    let attempt = {
      let mut attempts = self.attempts.lock().expect("lock poisoned");
      let n = attempts.entry(item.name.clone()).or_insert(0);
      *n += 1;
      *n
    };
    if attempt == 1 {
      self
        .started
        .lock()
        .expect("lock poisoned")
        .push(item.name.clone());
    }
    self
      .inputs
      .lock()
      .expect("lock poisoned")
      .insert(item.name.clone(), item.input.clone());
    let _in_flight = self.enter();

    let script = self
      .scripts
      .get(&item.name)
      .cloned()
      .unwrap_or(Script::Succeed(ValueMap::new()));

    match script {
      Script::Succeed(output) => Ok(output),
      Script::Fail(message) => Err(RunnerError::Failed { message }),
      Script::FailTimes { failures, output } => {
        if attempt <= failures {
          Err(RunnerError::failed(format!(
            "scripted failure on attempt {attempt}"
          )))
        } else {
          Ok(output)
        }
      }
      Script::Delay { delay, output } => {
        tokio::select! {
          _ = tokio::time::sleep(delay) => Ok(output),
          _ = cancel.cancelled() => Err(RunnerError::Cancelled),
        }
      }
      Script::SlowStart {
        slow_attempts,
        delay,
        output,
      } => {
        if attempt <= slow_attempts {
          tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(output),
            _ = cancel.cancelled() => Err(RunnerError::Cancelled),
          }
        } else {
          Ok(output)
        }
      }
      Script::Finishing { delay, output } => {
        tokio::time::sleep(delay).await;
        Ok(output)
      }
      Script::Hang => {
        cancel.cancelled().await;
        Err(RunnerError::Cancelled)
      }
      Script::Stall => std::future::pending().await,
      Script::Panic => panic!("scripted panic for '{}'", item.name),
    }
  }
}
