use std::time::Duration;

use serde::{Deserialize, Serialize};

use drover_executor::{BackoffPolicy, ExecutorConfig};
use drover_runner::ProcessRunnerConfig;

/// Orchestrator tuning, loaded from an optional JSON config file.
///
/// Every field has a default, so an empty object (or a missing file) yields
/// a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
  #[serde(default = "default_ceiling")]
  pub ceiling: usize,
  #[serde(default = "default_backoff_base_ms")]
  pub backoff_base_ms: u64,
  #[serde(default = "default_backoff_multiplier")]
  pub backoff_multiplier: f64,
  #[serde(default = "default_backoff_max_ms")]
  pub backoff_max_ms: u64,
  #[serde(default = "default_grace_period_ms")]
  pub grace_period_ms: u64,
  #[serde(default)]
  pub runner: RunnerSettings,
}

/// Which program executes items, and under what default deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
  /// Program invoked per item. Must be set before `drover run` works.
  #[serde(default)]
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
  /// Deadline for items without their own timeout; null disables it.
  #[serde(default = "default_timeout_ms")]
  pub default_timeout_ms: Option<u64>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      ceiling: default_ceiling(),
      backoff_base_ms: default_backoff_base_ms(),
      backoff_multiplier: default_backoff_multiplier(),
      backoff_max_ms: default_backoff_max_ms(),
      grace_period_ms: default_grace_period_ms(),
      runner: RunnerSettings::default(),
    }
  }
}

impl Default for RunnerSettings {
  fn default() -> Self {
    Self {
      program: String::new(),
      args: Vec::new(),
      default_timeout_ms: default_timeout_ms(),
    }
  }
}

impl Settings {
  pub fn executor_config(&self) -> ExecutorConfig {
    ExecutorConfig {
      backoff: BackoffPolicy {
        base: Duration::from_millis(self.backoff_base_ms),
        multiplier: self.backoff_multiplier,
        max: Duration::from_millis(self.backoff_max_ms),
      },
      grace_period: Duration::from_millis(self.grace_period_ms),
    }
  }

  pub fn runner_config(&self) -> ProcessRunnerConfig {
    ProcessRunnerConfig {
      program: self.runner.program.clone(),
      args: self.runner.args.clone(),
      default_timeout: self.runner.default_timeout_ms.map(Duration::from_millis),
    }
  }
}

fn default_ceiling() -> usize {
  5
}

fn default_backoff_base_ms() -> u64 {
  1_000
}

fn default_backoff_multiplier() -> f64 {
  2.0
}

fn default_backoff_max_ms() -> u64 {
  10_000
}

fn default_grace_period_ms() -> u64 {
  3_000
}

fn default_timeout_ms() -> Option<u64> {
  Some(300_000)
}
