use std::path::PathBuf;

use drover_config::DefError;
use thiserror::Error;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("no definition named '{name}'")]
  NotFound { name: String },

  #[error("a definition named '{name}' already exists")]
  AlreadyExists { name: String },

  #[error("invalid definition: {0}")]
  Invalid(#[from] DefError),

  #[error("malformed definition at {}: {source}", path.display())]
  Malformed {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("filesystem error: {0}")]
  Io(#[from] std::io::Error),
}
