//! Drover Config
//!
//! Serializable definition types for drover. These represent work items and
//! plans as users write them in JSON files or store them in the catalog,
//! before they are turned into runtime structures, plus the tuning settings
//! the CLI loads from an optional config file.

mod def;
mod error;
mod plan;
mod settings;

pub use def::{ItemDef, validate_name};
pub use error::DefError;
pub use plan::{PlanDef, PlanMode};
pub use settings::{RunnerSettings, Settings};
