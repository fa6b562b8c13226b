use std::path::Path;

use async_trait::async_trait;
use drover_config::ItemDef;
use tokio::fs;

use crate::error::CatalogError;

/// Storage for item definitions.
#[async_trait]
pub trait Catalog: Send + Sync {
  /// Definitions sorted by name, optionally filtered by a search string
  /// matched against name, description and tags.
  async fn list(&self, search: Option<&str>) -> Result<Vec<ItemDef>, CatalogError>;

  async fn get(&self, name: &str) -> Result<ItemDef, CatalogError>;

  /// Store a definition. Refuses to replace an existing one unless
  /// `overwrite` is set.
  async fn put(&self, def: &ItemDef, overwrite: bool) -> Result<(), CatalogError>;

  async fn delete(&self, name: &str) -> Result<(), CatalogError>;

  /// Read a definition file from an arbitrary path and store it.
  async fn import(&self, path: &Path, overwrite: bool) -> Result<ItemDef, CatalogError> {
    let content = fs::read_to_string(path).await?;
    let def: ItemDef =
      serde_json::from_str(&content).map_err(|source| CatalogError::Malformed {
        path: path.to_path_buf(),
        source,
      })?;
    self.put(&def, overwrite).await?;
    Ok(def)
  }

  /// Write a stored definition out to an arbitrary path.
  async fn export(&self, name: &str, dest: &Path) -> Result<(), CatalogError> {
    let def = self.get(name).await?;
    let json = serde_json::to_string_pretty(&def).map_err(|source| CatalogError::Malformed {
      path: dest.to_path_buf(),
      source,
    })?;
    fs::write(dest, json).await?;
    Ok(())
  }
}
