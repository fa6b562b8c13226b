//! Drover Report
//!
//! Turns the result set of a completed run into something readable: outcome
//! counts, duration statistics and a per-item table, rendered as plain text,
//! Markdown or JSON. Pure functions over [`drover_item::ExecutionResult`]s;
//! writing the rendered report anywhere is the caller's business.

mod format;
mod report;

pub use format::{ReportFormat, UnknownFormat};
pub use report::{DurationStats, ItemRow, RunReport};
