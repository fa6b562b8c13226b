use thiserror::Error;

/// Errors found while validating definitions, before anything runs.
#[derive(Debug, Error)]
pub enum DefError {
  #[error("item name must not be empty")]
  EmptyName,

  #[error("item name '{name}' is not a plain name")]
  UnsafeName { name: String },

  #[error("item '{name}' declares a zero timeout")]
  ZeroTimeout { name: String },

  #[error("plan '{name}' has no items")]
  EmptyPlan { name: String },
}
