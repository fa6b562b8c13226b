//! Drover work items
//!
//! This crate contains the core data model shared by every layer of drover:
//! the immutable [`WorkItem`] submitted by callers, the [`ExecutionResult`]
//! produced for each item, the [`DependencyGraph`] used to validate and order
//! dependent items before anything runs, and the execution event types that
//! let consumers observe a run in flight.

mod error;
mod events;
mod graph;
mod item;
mod result;

pub use error::ValidationError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use graph::{DependencyGraph, ensure_unique_names};
pub use item::{ValueMap, WorkItem};
pub use result::{ExecutionResult, Outcome};
