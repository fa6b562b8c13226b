//! Drover execution pipeline
//!
//! Three composable layers sit between the orchestration surfaces and a
//! runner:
//!
//! - the attempt guard races one runner call against the item deadline and
//!   the request cancellation signal,
//! - [`execute_item`] drives attempts to a terminal outcome, retrying failed
//!   and timed-out attempts with exponential backoff,
//! - [`ItemDispatcher`] feeds a fixed worker pool from a FIFO queue so at
//!   most `ceiling` items run at once, streaming results back as they
//!   finish.
//!
//! Every layer takes the cancellation token explicitly; there is no global
//! state to reach around.

mod attempt;
mod config;
mod dispatch;
mod retry;

pub use config::{BackoffPolicy, ExecutorConfig};
pub use dispatch::{DispatchHandle, ItemDispatcher};
pub use retry::execute_item;
