use serde::{Deserialize, Serialize};

use crate::def::ItemDef;
use crate::error::DefError;

/// A runnable request file: a named set of items plus the execution mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDef {
  pub name: String,
  #[serde(flatten)]
  pub mode: PlanMode,
  pub items: Vec<ItemDef>,
}

/// How a plan's items are executed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlanMode {
  /// Dependency-ordered waves through the bounded dispatcher.
  Graph { ceiling: Option<usize> },
  /// One item at a time, optionally piping each output into the next input.
  Pipeline {
    #[serde(default)]
    pass_output: bool,
  },
  /// Everything at once under the ceiling.
  Batch {
    ceiling: Option<usize>,
    #[serde(default)]
    fail_fast: bool,
  },
}

impl std::fmt::Display for PlanMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      PlanMode::Graph { .. } => "graph",
      PlanMode::Pipeline { .. } => "pipeline",
      PlanMode::Batch { .. } => "batch",
    };
    f.write_str(s)
  }
}

impl PlanDef {
  /// Check every definition in the plan. Graph structure is validated by the
  /// scheduler from the built items.
  pub fn validate(&self) -> Result<(), DefError> {
    if self.items.is_empty() {
      return Err(DefError::EmptyPlan {
        name: self.name.clone(),
      });
    }
    for item in &self.items {
      item.validate()?;
    }
    Ok(())
  }

  /// Build the runtime items for this plan.
  pub fn to_items(&self) -> Vec<drover_item::WorkItem> {
    self.items.iter().map(ItemDef::to_item).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_a_graph_plan() {
    let plan: PlanDef = serde_json::from_value(serde_json::json!({
      "name": "nightly",
      "mode": "graph",
      "ceiling": 3,
      "items": [
        { "name": "fetch" },
        { "name": "build", "dependencies": ["fetch"] }
      ]
    }))
    .unwrap();

    assert_eq!(plan.name, "nightly");
    assert!(matches!(plan.mode, PlanMode::Graph { ceiling: Some(3) }));
    assert_eq!(plan.items.len(), 2);
    assert!(plan.validate().is_ok());
  }

  #[test]
  fn parses_a_pipeline_plan_with_defaults() {
    let plan: PlanDef = serde_json::from_value(serde_json::json!({
      "name": "release",
      "mode": "pipeline",
      "items": [{ "name": "build" }, { "name": "publish" }]
    }))
    .unwrap();

    assert!(matches!(plan.mode, PlanMode::Pipeline { pass_output: false }));
  }

  #[test]
  fn parses_a_batch_plan() {
    let plan: PlanDef = serde_json::from_value(serde_json::json!({
      "name": "sweep",
      "mode": "batch",
      "fail_fast": true,
      "items": [{ "name": "a" }]
    }))
    .unwrap();

    assert!(matches!(
      plan.mode,
      PlanMode::Batch {
        ceiling: None,
        fail_fast: true
      }
    ));
  }

  #[test]
  fn empty_plans_are_invalid() {
    let plan: PlanDef = serde_json::from_value(serde_json::json!({
      "name": "hollow",
      "mode": "batch",
      "items": []
    }))
    .unwrap();

    assert!(matches!(
      plan.validate(),
      Err(DefError::EmptyPlan { ref name }) if name == "hollow"
    ));
  }

  #[test]
  fn mode_survives_a_round_trip() {
    let plan = PlanDef {
      name: "nightly".to_string(),
      mode: PlanMode::Graph { ceiling: None },
      items: vec![ItemDef::new("fetch")],
    };

    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json.get("mode").and_then(|v| v.as_str()), Some("graph"));
    let back: PlanDef = serde_json::from_value(json).unwrap();
    assert_eq!(back, plan);
  }
}
