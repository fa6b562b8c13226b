use std::path::{Path, PathBuf};

use async_trait::async_trait;
use drover_config::{ItemDef, validate_name};
use tokio::fs;

use crate::catalog::Catalog;
use crate::error::CatalogError;

/// Filesystem-backed catalog.
///
/// Definitions are stored flat under the root directory:
/// ```text
/// {root}/
/// ├── fetch-users.json
/// └── nightly-report.json
/// ```
pub struct FsCatalog {
  root: PathBuf,
}

impl FsCatalog {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path_of(&self, name: &str) -> PathBuf {
    self.root.join(format!("{name}.json"))
  }

  async fn read_def(&self, path: &Path) -> Result<ItemDef, CatalogError> {
    let content = fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|source| CatalogError::Malformed {
      path: path.to_path_buf(),
      source,
    })
  }
}

#[async_trait]
impl Catalog for FsCatalog {
  async fn list(&self, search: Option<&str>) -> Result<Vec<ItemDef>, CatalogError> {
    let mut defs = Vec::new();

    if !self.root.exists() {
      return Ok(defs);
    }

    let mut entries = fs::read_dir(&self.root).await?;
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }
      // Files that do not parse are someone else's; skip them.
      if let Ok(def) = self.read_def(&path).await {
        defs.push(def);
      }
    }

    if let Some(needle) = search {
      defs.retain(|def| def.matches_search(needle));
    }
    defs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(defs)
  }

  async fn get(&self, name: &str) -> Result<ItemDef, CatalogError> {
    validate_name(name)?;
    let path = self.path_of(name);
    match self.read_def(&path).await {
      Err(CatalogError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
        Err(CatalogError::NotFound {
          name: name.to_string(),
        })
      }
      other => other,
    }
  }

  async fn put(&self, def: &ItemDef, overwrite: bool) -> Result<(), CatalogError> {
    def.validate()?;
    fs::create_dir_all(&self.root).await?;

    let path = self.path_of(&def.name);
    if !overwrite && fs::try_exists(&path).await? {
      return Err(CatalogError::AlreadyExists {
        name: def.name.clone(),
      });
    }

    let json = serde_json::to_string_pretty(def).map_err(|source| CatalogError::Malformed {
      path: path.clone(),
      source,
    })?;
    fs::write(&path, json).await?;
    Ok(())
  }

  async fn delete(&self, name: &str) -> Result<(), CatalogError> {
    validate_name(name)?;
    match fs::remove_file(self.path_of(name)).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CatalogError::NotFound {
        name: name.to_string(),
      }),
      Err(e) => Err(e.into()),
    }
  }
}
