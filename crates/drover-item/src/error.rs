use thiserror::Error;

/// Request validation failures.
///
/// Validation runs before any item starts; a validation error means the
/// request was rejected atomically and nothing was executed.
#[derive(Debug, Error)]
pub enum ValidationError {
  #[error("duplicate item name '{name}'")]
  DuplicateName { name: String },

  #[error("item '{item}' depends on unknown item '{dependency}'")]
  UnknownDependency { item: String, dependency: String },

  #[error("item '{name}' depends on itself")]
  SelfDependency { name: String },

  #[error("dependency cycle among items: {}", .involved.join(", "))]
  DependencyCycle { involved: Vec<String> },
}
