use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::ValidationError;
use crate::item::WorkItem;

/// Reject a request whose items do not have unique names.
pub fn ensure_unique_names(items: &[WorkItem]) -> Result<(), ValidationError> {
  let mut seen = HashSet::new();
  for item in items {
    if !seen.insert(item.name.as_str()) {
      return Err(ValidationError::DuplicateName {
        name: item.name.clone(),
      });
    }
  }
  Ok(())
}

/// Validated dependency structure for a set of work items.
///
/// Building the graph performs every structural check up front: duplicate
/// names, self-dependencies, references to unknown items and dependency
/// cycles. A successfully built graph is guaranteed acyclic, and building is
/// side-effect free, so re-validating the same items yields the same answer.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
  /// Item names in a valid topological order (dependencies first).
  order: Vec<String>,
  /// Item name -> direct dependencies, in declared order.
  dependencies: HashMap<String, Vec<String>>,
  /// Item name -> items that directly depend on it.
  dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
  /// Build and validate the graph for a request.
  pub fn build(items: &[WorkItem]) -> Result<Self, ValidationError> {
    ensure_unique_names(items)?;

    let known: HashSet<&str> = items.iter().map(|i| i.name.as_str()).collect();
    for item in items {
      for dep in &item.dependencies {
        if *dep == item.name {
          return Err(ValidationError::SelfDependency {
            name: item.name.clone(),
          });
        }
        if !known.contains(dep.as_str()) {
          return Err(ValidationError::UnknownDependency {
            item: item.name.clone(),
            dependency: dep.clone(),
          });
        }
      }
    }

    let mut dependencies: HashMap<String, Vec<String>> = HashMap::new();
    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
    let mut indegree: HashMap<String, usize> = HashMap::new();

    for item in items {
      dependencies.insert(item.name.clone(), item.dependencies.clone());
      dependents.entry(item.name.clone()).or_default();
      indegree.insert(item.name.clone(), item.dependencies.len());
    }
    for item in items {
      for dep in &item.dependencies {
        dependents
          .entry(dep.clone())
          .or_default()
          .push(item.name.clone());
      }
    }

    // Kahn's algorithm; seeding in submission order keeps the result stable.
    let mut queue: VecDeque<String> = items
      .iter()
      .filter(|i| i.dependencies.is_empty())
      .map(|i| i.name.clone())
      .collect();
    let mut order = Vec::with_capacity(items.len());

    while let Some(name) = queue.pop_front() {
      for dependent in dependents.get(&name).map(|v| v.as_slice()).unwrap_or(&[]) {
        if let Some(remaining) = indegree.get_mut(dependent) {
          *remaining -= 1;
          if *remaining == 0 {
            queue.push_back(dependent.clone());
          }
        }
      }
      order.push(name);
    }

    if order.len() != items.len() {
      let mut involved: Vec<String> = indegree
        .into_iter()
        .filter(|(_, remaining)| *remaining > 0)
        .map(|(name, _)| name)
        .collect();
      involved.sort();
      return Err(ValidationError::DependencyCycle { involved });
    }

    Ok(Self {
      order,
      dependencies,
      dependents,
    })
  }

  /// Item names in dependency-first order.
  pub fn topological_order(&self) -> &[String] {
    &self.order
  }

  /// Direct dependencies of an item, in declared order.
  pub fn dependencies_of(&self, name: &str) -> &[String] {
    self
      .dependencies
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Items that directly depend on the given one.
  pub fn dependents_of(&self, name: &str) -> &[String] {
    self
      .dependents
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}
