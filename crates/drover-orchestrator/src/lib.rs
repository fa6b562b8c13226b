//! Drover Orchestrator
//!
//! This crate coordinates whole runs. It re-exports the executor
//! configuration from `drover-executor` and provides an `Orchestrator`
//! with three entry points: dependency-graph runs, sequential pipelines
//! and unordered batches.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Orchestrator                          │
//! │  - run_graph(items, ceiling)    wave-by-wave scheduling     │
//! │  - run_pipeline(items, pass)    sequential, output piping   │
//! │  - run_batch(items, ...)        concurrent, fail-fast       │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ItemDispatcher                         │
//! │  - bounded worker pool, admission in submission order       │
//! │  - retry + timeout handling per item                        │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Runner                              │
//! │  - executes a single attempt of a single item               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use drover_orchestrator::{ExecutorConfig, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! let runner = Arc::new(ProcessRunner::new(runner_config));
//! let orchestrator = Orchestrator::new(runner, ExecutorConfig::default());
//!
//! let cancel = CancellationToken::new();
//! let results = orchestrator.run_graph(items, 4, cancel).await?;
//! ```

mod orchestrator;

// Re-export from drover-executor
pub use drover_executor::{BackoffPolicy, ExecutorConfig};

pub use orchestrator::Orchestrator;
