//! Drover runners
//!
//! A [`Runner`] executes one work item at a time and knows nothing about
//! concurrency, retries or dependencies; all of that lives above it. The
//! crate ships [`ProcessRunner`], which shells out to a configured program
//! per item, and a scripted in-memory runner for tests.

mod process;
mod runner;
pub mod testing;

pub use process::{ProcessRunner, ProcessRunnerConfig};
pub use runner::{Runner, RunnerError};
