use std::time::Duration;

/// Opaque key/value payload passed to and returned from runners.
pub type ValueMap = serde_json::Map<String, serde_json::Value>;

/// A named unit of work to be executed by a runner.
///
/// Work items are immutable once submitted. `name` must be unique within a
/// single request; it identifies the item in results, events and dependency
/// declarations.
#[derive(Debug, Clone)]
pub struct WorkItem {
  /// Unique name within one request.
  pub name: String,
  /// Input parameters handed to the runner untouched.
  pub input: ValueMap,
  /// Upper bound on a single attempt. `None` leaves the deadline to the
  /// runner (a process runner may still apply its configured default).
  pub timeout: Option<Duration>,
  /// Additional attempts allowed after the first one fails or times out.
  pub retry_budget: u32,
  /// Names of items that must succeed before this one starts.
  pub dependencies: Vec<String>,
}

impl WorkItem {
  /// Create an item with empty input, no timeout, no retries and no
  /// dependencies.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      input: ValueMap::new(),
      timeout: None,
      retry_budget: 0,
      dependencies: Vec::new(),
    }
  }

  pub fn with_input(mut self, input: ValueMap) -> Self {
    self.input = input;
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
    self.retry_budget = retry_budget;
    self
  }

  pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
    self.dependencies = dependencies;
    self
  }

  /// Add a single dependency by name.
  pub fn depends_on(mut self, name: impl Into<String>) -> Self {
    self.dependencies.push(name.into());
    self
  }
}
