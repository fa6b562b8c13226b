use drover_item::{ExecutionResult, Outcome};
use serde::Serialize;

use crate::format::ReportFormat;

/// Summary of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub total: usize,
  pub succeeded: usize,
  pub failed: usize,
  pub timed_out: usize,
  pub cancelled: usize,
  /// Fraction of items that succeeded, 0.0 to 1.0.
  pub success_rate: f64,
  pub total_attempts: u64,
  /// Statistics over items that made at least one attempt.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub durations: Option<DurationStats>,
  pub items: Vec<ItemRow>,
}

/// One line of the per-item table.
#[derive(Debug, Clone, Serialize)]
pub struct ItemRow {
  pub name: String,
  pub outcome: Outcome,
  pub attempts: u32,
  pub duration_ms: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_detail: Option<String>,
}

/// Wall-time statistics in milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct DurationStats {
  pub min_ms: u64,
  pub mean_ms: u64,
  pub max_ms: u64,
  pub p50_ms: u64,
  pub p95_ms: u64,
}

impl RunReport {
  pub fn from_results(results: &[ExecutionResult]) -> Self {
    let mut succeeded = 0;
    let mut failed = 0;
    let mut timed_out = 0;
    let mut cancelled = 0;
    for result in results {
      match result.outcome {
        Outcome::Success => succeeded += 1,
        Outcome::Failed => failed += 1,
        Outcome::TimedOut => timed_out += 1,
        Outcome::Cancelled => cancelled += 1,
      }
    }

    let items: Vec<ItemRow> = results.iter().map(ItemRow::from_result).collect();
    let mut ran_ms: Vec<u64> = items
      .iter()
      .filter(|row| row.attempts > 0)
      .map(|row| row.duration_ms)
      .collect();
    ran_ms.sort_unstable();

    Self {
      total: results.len(),
      succeeded,
      failed,
      timed_out,
      cancelled,
      success_rate: if results.is_empty() {
        0.0
      } else {
        succeeded as f64 / results.len() as f64
      },
      total_attempts: results.iter().map(|r| u64::from(r.attempts)).sum(),
      durations: DurationStats::from_sorted(&ran_ms),
      items,
    }
  }

  pub fn render(&self, format: ReportFormat) -> String {
    match format {
      ReportFormat::Json => serde_json::to_string_pretty(self).unwrap_or_default(),
      ReportFormat::Text => self.render_text(),
      ReportFormat::Markdown => self.render_markdown(),
    }
  }

  fn headline(&self) -> String {
    format!(
      "{} items: {} succeeded, {} failed, {} timed out, {} cancelled ({:.1}% success)",
      self.total,
      self.succeeded,
      self.failed,
      self.timed_out,
      self.cancelled,
      self.success_rate * 100.0
    )
  }

  fn render_text(&self) -> String {
    let mut out = String::new();
    out.push_str(&self.headline());
    out.push('\n');
    out.push_str(&format!("attempts: {}\n", self.total_attempts));
    if let Some(stats) = &self.durations {
      out.push_str(&format!(
        "durations: min {}ms, mean {}ms, max {}ms, p50 {}ms, p95 {}ms\n",
        stats.min_ms, stats.mean_ms, stats.max_ms, stats.p50_ms, stats.p95_ms
      ));
    }

    if !self.items.is_empty() {
      out.push('\n');
    }
    let width = self
      .items
      .iter()
      .map(|row| row.name.len())
      .max()
      .unwrap_or(0);
    for row in &self.items {
      out.push_str(&format!(
        "  {:<width$}  {:<9}  {:>3}x  {:>6}ms",
        row.name,
        row.outcome.to_string(),
        row.attempts,
        row.duration_ms,
        width = width
      ));
      if let Some(detail) = &row.error_detail {
        out.push_str("  ");
        out.push_str(detail);
      }
      out.push('\n');
    }
    out
  }

  fn render_markdown(&self) -> String {
    let mut out = String::new();
    out.push_str("## Run report\n\n");
    out.push_str(&self.headline());
    out.push_str("\n\n");
    out.push_str("| item | outcome | attempts | duration | detail |\n");
    out.push_str("|---|---|---:|---:|---|\n");
    for row in &self.items {
      let detail = row
        .error_detail
        .as_deref()
        .unwrap_or("")
        .replace('|', "\\|");
      out.push_str(&format!(
        "| {} | {} | {} | {}ms | {} |\n",
        row.name, row.outcome, row.attempts, row.duration_ms, detail
      ));
    }
    out
  }
}

impl ItemRow {
  fn from_result(result: &ExecutionResult) -> Self {
    Self {
      name: result.name.clone(),
      outcome: result.outcome,
      attempts: result.attempts,
      duration_ms: result.duration().num_milliseconds().max(0) as u64,
      error_detail: result.error_detail.clone(),
    }
  }
}

impl DurationStats {
  fn from_sorted(sorted_ms: &[u64]) -> Option<Self> {
    if sorted_ms.is_empty() {
      return None;
    }
    let sum: u64 = sorted_ms.iter().sum();
    Some(Self {
      min_ms: sorted_ms[0],
      mean_ms: sum / sorted_ms.len() as u64,
      max_ms: sorted_ms[sorted_ms.len() - 1],
      p50_ms: percentile(sorted_ms, 0.50),
      p95_ms: percentile(sorted_ms, 0.95),
    })
  }
}

/// Nearest-rank percentile over an already sorted slice.
fn percentile(sorted: &[u64], q: f64) -> u64 {
  let index = ((sorted.len() - 1) as f64 * q).round() as usize;
  sorted[index.min(sorted.len() - 1)]
}
