//! Execution events and notifiers.
//!
//! Events are emitted while a request runs so that consumers can observe
//! progress without polling: stream to a UI, keep counters, mirror into logs.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::result::Outcome;

/// Events emitted over the lifetime of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
  /// A request was accepted and execution is starting.
  RunStarted { run_id: String, items: usize },

  /// An item was admitted and its first attempt is starting.
  ItemStarted { run_id: String, item: String },

  /// An attempt failed or timed out and another attempt will be made after
  /// the backoff delay.
  ItemRetrying {
    run_id: String,
    item: String,
    next_attempt: u32,
    error: String,
  },

  /// An item reached a terminal outcome.
  ItemFinished {
    run_id: String,
    item: String,
    outcome: Outcome,
    attempts: u32,
  },

  /// Every item of the request has a result.
  RunFinished {
    run_id: String,
    succeeded: usize,
    total: usize,
  },
}

/// Trait for receiving execution events.
///
/// The orchestration layers call `notify` for each event; implementations
/// decide what to do with them (broadcast, count, log, ignore).
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Notifier that forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // NOTE: unbounded so a slow consumer can never stall dispatch workers. The
  // volume is small (a handful of events per item), so buffering is not a
  // practical concern; switch to try_send on a bounded channel if it becomes
  // one.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // The receiver may already be gone; that is not our problem.
    let _ = self.sender.send(event);
  }
}
