use std::time::Duration;

use serde::{Deserialize, Serialize};

use drover_item::{ValueMap, WorkItem};

use crate::error::DefError;

/// A work item as written in a plan file or stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default)]
  pub input: ValueMap,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  #[serde(default)]
  pub retry_budget: u32,
  #[serde(default)]
  pub dependencies: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
}

impl ItemDef {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      description: None,
      input: ValueMap::new(),
      timeout_ms: None,
      retry_budget: 0,
      dependencies: Vec::new(),
      tags: Vec::new(),
    }
  }

  /// Check definition-level rules. Graph structure (unknown references,
  /// cycles) is checked by the scheduler when the items are submitted.
  pub fn validate(&self) -> Result<(), DefError> {
    validate_name(&self.name)?;
    if self.timeout_ms == Some(0) {
      return Err(DefError::ZeroTimeout {
        name: self.name.clone(),
      });
    }
    Ok(())
  }

  /// Build the runtime work item this definition describes.
  pub fn to_item(&self) -> WorkItem {
    let mut item = WorkItem::new(&self.name)
      .with_input(self.input.clone())
      .with_retry_budget(self.retry_budget)
      .with_dependencies(self.dependencies.clone());
    if let Some(ms) = self.timeout_ms {
      item = item.with_timeout(Duration::from_millis(ms));
    }
    item
  }

  /// Case-insensitive match against name, description and tags.
  pub fn matches_search(&self, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    self.name.to_lowercase().contains(&needle)
      || self
        .description
        .as_deref()
        .is_some_and(|d| d.to_lowercase().contains(&needle))
      || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
  }
}

/// Names become `{name}.json` files in the catalog, so path syntax is out.
pub fn validate_name(name: &str) -> Result<(), DefError> {
  if name.is_empty() {
    return Err(DefError::EmptyName);
  }
  let plain = !name.starts_with('.')
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
  if !plain {
    return Err(DefError::UnsafeName {
      name: name.to_string(),
    });
  }
  Ok(())
}
