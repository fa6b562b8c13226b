use std::str::FromStr;

use thiserror::Error;

/// Output shape for a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
  Text,
  Json,
  Markdown,
}

#[derive(Debug, Error)]
#[error("unknown report format '{0}' (use text, json or markdown)")]
pub struct UnknownFormat(String);

impl FromStr for ReportFormat {
  type Err = UnknownFormat;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "text" => Ok(ReportFormat::Text),
      "json" => Ok(ReportFormat::Json),
      "markdown" | "md" => Ok(ReportFormat::Markdown),
      other => Err(UnknownFormat(other.to_string())),
    }
  }
}
