//! Process-backed runner.
//!
//! Each item is executed by spawning a configured program with the item name
//! as its final argument and the input map as JSON on stdin. Stdout is parsed
//! as a JSON object; anything else is wrapped under an `"output"` key.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use drover_item::{ValueMap, WorkItem};

use crate::runner::{Runner, RunnerError};

/// Configuration for [`ProcessRunner`].
#[derive(Debug, Clone)]
pub struct ProcessRunnerConfig {
  /// Program invoked for every item.
  pub program: String,
  /// Arguments placed before the item name.
  pub args: Vec<String>,
  /// Deadline applied when the item carries no timeout of its own.
  pub default_timeout: Option<Duration>,
}

/// Runner that executes each item as a child process.
pub struct ProcessRunner {
  config: ProcessRunnerConfig,
}

impl ProcessRunner {
  pub fn new(config: ProcessRunnerConfig) -> Self {
    Self { config }
  }
}

#[async_trait]
impl Runner for ProcessRunner {
  async fn run(&self, item: &WorkItem, cancel: CancellationToken) -> Result<ValueMap, RunnerError> {
    let payload = serde_json::Value::Object(item.input.clone()).to_string();

    let mut child = Command::new(&self.config.program)
      .args(&self.config.args)
      .arg(&item.name)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| {
        RunnerError::failed(format!("failed to spawn '{}': {}", self.config.program, e))
      })?;

    debug!(item = %item.name, program = %self.config.program, "process_spawned");

    // All three pipes move to their own tasks before anything is awaited. A
    // payload larger than the pipe buffer blocks write_all until the child
    // reads, and a child that writes more than a buffer of output blocks
    // until someone drains it, so feeding stdin inline ahead of the select
    // can wedge the run with the deadline and cancel arms never reached.
    let stdout_task = child.stdout.take().map(|pipe| tokio::spawn(drain(pipe)));
    let stderr_task = child.stderr.take().map(|pipe| tokio::spawn(drain(pipe)));
    if let Some(mut stdin) = child.stdin.take() {
      // The child may exit without reading stdin; ignore the broken pipe.
      tokio::spawn(async move {
        let _ = stdin.write_all(payload.as_bytes()).await;
        let _ = stdin.shutdown().await;
      });
    }

    // Only fall back to the configured deadline when the item has none; an
    // explicit item timeout is enforced by the executor above us.
    let deadline = match item.timeout {
      Some(_) => None,
      None => self.config.default_timeout,
    };

    let status = tokio::select! {
      status = child.wait() => {
        status.map_err(|e| RunnerError::failed(format!("failed to wait for process: {e}")))?
      }
      after = deadline_elapsed(deadline) => {
        let _ = child.start_kill();
        let _ = child.wait().await;
        return Err(RunnerError::TimedOut { after });
      }
      _ = cancel.cancelled() => {
        let _ = child.start_kill();
        let _ = child.wait().await;
        return Err(RunnerError::Cancelled);
      }
    };

    let stdout = collect(stdout_task).await;
    let stderr = collect(stderr_task).await;

    if !status.success() {
      let detail = stderr.trim();
      let message = if detail.is_empty() {
        format!("process exited with {status}")
      } else {
        format!("process exited with {status}: {}", excerpt(detail))
      };
      return Err(RunnerError::Failed { message });
    }

    Ok(parse_output(&stdout))
  }
}

async fn drain(mut pipe: impl tokio::io::AsyncRead + Unpin) -> String {
  let mut buf = Vec::new();
  let _ = pipe.read_to_end(&mut buf).await;
  String::from_utf8_lossy(&buf).into_owned()
}

async fn collect(task: Option<tokio::task::JoinHandle<String>>) -> String {
  match task {
    Some(handle) => handle.await.unwrap_or_default(),
    None => String::new(),
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

fn parse_output(stdout: &str) -> ValueMap {
  let trimmed = stdout.trim();
  if trimmed.is_empty() {
    return ValueMap::new();
  }

  match serde_json::from_str::<serde_json::Value>(trimmed) {
    Ok(serde_json::Value::Object(map)) => map,
    Ok(other) => {
      let mut map = ValueMap::new();
      map.insert("output".to_string(), other);
      map
    }
    Err(_) => {
      let mut map = ValueMap::new();
      map.insert(
        "output".to_string(),
        serde_json::Value::String(trimmed.to_string()),
      );
      map
    }
  }
}

/// Keep error details readable when a runner dumps a stack trace to stderr.
fn excerpt(text: &str) -> String {
  const LIMIT: usize = 500;
  if text.len() <= LIMIT {
    return text.to_string();
  }
  let mut cut: String = text.chars().take(LIMIT).collect();
  cut.push_str("...");
  cut
}
