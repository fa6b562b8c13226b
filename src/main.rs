use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail, ensure};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use drover_catalog::{Catalog, FsCatalog};
use drover_config::{PlanDef, PlanMode, Settings};
use drover_item::{DependencyGraph, ValueMap, WorkItem, ensure_unique_names};
use drover_orchestrator::Orchestrator;
use drover_report::{ReportFormat, RunReport};
use drover_runner::ProcessRunner;

/// Drover - a concurrent work-item execution orchestrator
#[derive(Parser)]
#[command(name = "drover")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.drover)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a plan or a single catalog item
  Run {
    #[command(subcommand)]
    target: RunTarget,
  },

  /// Check a plan file without executing anything
  Validate {
    /// Path to the plan file (JSON)
    plan_file: PathBuf,
  },

  /// List catalog definitions
  List {
    /// Only show definitions matching this search string
    #[arg(long)]
    search: Option<String>,
  },

  /// Add a definition file to the catalog
  Add {
    /// Path to the definition file (JSON)
    def_file: PathBuf,

    /// Replace an existing definition with the same name
    #[arg(long)]
    overwrite: bool,
  },

  /// Remove a definition from the catalog
  Remove {
    /// Definition name
    name: String,
  },

  /// Write a catalog definition out to a file
  Export {
    /// Definition name
    name: String,

    /// Destination file
    dest: PathBuf,
  },
}

#[derive(Subcommand)]
enum RunTarget {
  /// Run an entire plan file
  Plan {
    /// Path to the plan file (JSON)
    plan_file: PathBuf,

    /// Report format: text, json or markdown
    #[arg(long, default_value = "text")]
    format: String,

    /// Write the report to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
  },

  /// Run a single item from the catalog
  Item {
    /// Definition name in the catalog
    name: String,

    /// Report format: text, json or markdown
    #[arg(long, default_value = "text")]
    format: String,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".drover")
  });

  match cli.command {
    Some(Commands::Run { target }) => match target {
      RunTarget::Plan {
        plan_file,
        format,
        out,
      } => {
        run_plan(plan_file, format, out, data_dir)?;
      }
      RunTarget::Item { name, format } => {
        run_item(name, format, data_dir)?;
      }
    },
    Some(Commands::Validate { plan_file }) => {
      validate_plan(plan_file)?;
    }
    Some(Commands::List { search }) => {
      list_defs(search, data_dir)?;
    }
    Some(Commands::Add {
      def_file,
      overwrite,
    }) => {
      add_def(def_file, overwrite, data_dir)?;
    }
    Some(Commands::Remove { name }) => {
      remove_def(name, data_dir)?;
    }
    Some(Commands::Export { name, dest }) => {
      export_def(name, dest, data_dir)?;
    }
    None => {
      println!("drover - use --help to see available commands");
    }
  }

  Ok(())
}

fn run_plan(
  plan_file: PathBuf,
  format: String,
  out: Option<PathBuf>,
  data_dir: PathBuf,
) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_plan_async(plan_file, format, out, data_dir).await })
}

async fn run_plan_async(
  plan_file: PathBuf,
  format: String,
  out: Option<PathBuf>,
  data_dir: PathBuf,
) -> Result<()> {
  let format: ReportFormat = format.parse()?;
  let plan = load_plan(&plan_file).await?;
  plan
    .validate()
    .with_context(|| format!("invalid plan '{}'", plan.name))?;

  eprintln!(
    "loaded plan '{}': {} items, mode {}",
    plan.name,
    plan.items.len(),
    plan.mode
  );

  let settings = load_settings(&data_dir).await?;
  let orchestrator = build_orchestrator(&settings, &data_dir)?;
  let cancel = cancel_on_ctrl_c();

  let items = plan.to_items();
  let results = match plan.mode {
    PlanMode::Graph { ceiling } => {
      orchestrator
        .run_graph(items, ceiling.unwrap_or(settings.ceiling), cancel)
        .await?
    }
    PlanMode::Pipeline { pass_output } => {
      orchestrator.run_pipeline(items, pass_output, cancel).await?
    }
    PlanMode::Batch { ceiling, fail_fast } => {
      orchestrator
        .run_batch(items, ceiling.unwrap_or(settings.ceiling), fail_fast, cancel)
        .await?
    }
  };

  let report = RunReport::from_results(&results);
  emit_report(&report, format, out.as_deref()).await?;

  ensure!(
    report.succeeded == report.total,
    "{} of {} items did not succeed",
    report.total - report.succeeded,
    report.total
  );
  Ok(())
}

fn run_item(name: String, format: String, data_dir: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_item_async(name, format, data_dir).await })
}

async fn run_item_async(name: String, format: String, data_dir: PathBuf) -> Result<()> {
  let format: ReportFormat = format.parse()?;

  let catalog = FsCatalog::new(defs_dir(&data_dir));
  let def = catalog
    .get(&name)
    .await
    .with_context(|| format!("failed to load definition '{name}'"))?;

  let mut item = def.to_item();
  if let Some(payload) = read_payload_from_stdin()? {
    item.input = payload;
  }
  eprintln!("running item '{}'", item.name);

  let settings = load_settings(&data_dir).await?;
  let orchestrator = build_orchestrator(&settings, &data_dir)?;
  let cancel = cancel_on_ctrl_c();

  let results = orchestrator.run_batch(vec![item], 1, false, cancel).await?;
  let report = RunReport::from_results(&results);
  emit_report(&report, format, None).await?;

  ensure!(report.succeeded == report.total, "'{name}' did not succeed");
  Ok(())
}

fn validate_plan(plan_file: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { validate_plan_async(plan_file).await })
}

async fn validate_plan_async(plan_file: PathBuf) -> Result<()> {
  let plan = load_plan(&plan_file).await?;
  plan
    .validate()
    .with_context(|| format!("invalid plan '{}'", plan.name))?;

  let items: Vec<WorkItem> = plan.to_items();
  match plan.mode {
    PlanMode::Graph { .. } => {
      DependencyGraph::build(&items)?;
    }
    PlanMode::Pipeline { .. } | PlanMode::Batch { .. } => {
      ensure_unique_names(&items)?;
      for item in &items {
        if !item.dependencies.is_empty() {
          eprintln!(
            "warning: item '{}' declares dependencies, but mode {} ignores them",
            item.name, plan.mode
          );
        }
      }
    }
  }

  println!(
    "plan '{}' is valid: {} items, mode {}",
    plan.name,
    plan.items.len(),
    plan.mode
  );
  Ok(())
}

fn list_defs(search: Option<String>, data_dir: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let catalog = FsCatalog::new(defs_dir(&data_dir));
    let defs = catalog.list(search.as_deref()).await?;

    if defs.is_empty() {
      println!("no definitions found");
      return Ok(());
    }
    for def in defs {
      let mut line = format!("{:<24}", def.name);
      if let Some(description) = &def.description {
        line.push_str(description);
      }
      if !def.tags.is_empty() {
        line.push_str(&format!(" [{}]", def.tags.join(", ")));
      }
      println!("{}", line.trim_end());
    }
    Ok(())
  })
}

fn add_def(def_file: PathBuf, overwrite: bool, data_dir: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let catalog = FsCatalog::new(defs_dir(&data_dir));
    let def = catalog
      .import(&def_file, overwrite)
      .await
      .with_context(|| format!("failed to import {}", def_file.display()))?;
    println!("added '{}'", def.name);
    Ok(())
  })
}

fn remove_def(name: String, data_dir: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let catalog = FsCatalog::new(defs_dir(&data_dir));
    catalog.delete(&name).await?;
    println!("removed '{name}'");
    Ok(())
  })
}

fn export_def(name: String, dest: PathBuf, data_dir: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let catalog = FsCatalog::new(defs_dir(&data_dir));
    catalog
      .export(&name, &dest)
      .await
      .with_context(|| format!("failed to export '{name}'"))?;
    println!("exported '{}' to {}", name, dest.display());
    Ok(())
  })
}

fn defs_dir(data_dir: &Path) -> PathBuf {
  data_dir.join("defs")
}

async fn load_plan(plan_file: &Path) -> Result<PlanDef> {
  let content = tokio::fs::read_to_string(plan_file)
    .await
    .with_context(|| format!("failed to read plan file: {}", plan_file.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse plan file: {}", plan_file.display()))
}

async fn load_settings(data_dir: &Path) -> Result<Settings> {
  let path = data_dir.join("config.json");
  match tokio::fs::read_to_string(&path).await {
    Ok(content) => serde_json::from_str(&content)
      .with_context(|| format!("failed to parse config file: {}", path.display())),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
    Err(e) => Err(e).with_context(|| format!("failed to read config file: {}", path.display())),
  }
}

fn build_orchestrator(
  settings: &Settings,
  data_dir: &Path,
) -> Result<Orchestrator<ProcessRunner>> {
  ensure!(
    !settings.runner.program.is_empty(),
    "no runner program configured; set runner.program in {}",
    data_dir.join("config.json").display()
  );
  let runner = Arc::new(ProcessRunner::new(settings.runner_config()));
  Ok(Orchestrator::new(runner, settings.executor_config()))
}

/// First Ctrl-C cancels the request token so the run drains gracefully.
fn cancel_on_ctrl_c() -> CancellationToken {
  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      eprintln!("interrupt received, cancelling run");
      trigger.cancel();
    }
  });
  cancel
}

async fn emit_report(report: &RunReport, format: ReportFormat, out: Option<&Path>) -> Result<()> {
  let rendered = report.render(format);
  match out {
    Some(path) => {
      tokio::fs::write(path, &rendered)
        .await
        .with_context(|| format!("failed to write report to {}", path.display()))?;
      eprintln!("report written to {}", path.display());
    }
    None => println!("{rendered}"),
  }
  Ok(())
}

fn read_payload_from_stdin() -> Result<Option<ValueMap>> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(None);
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;
  if input.trim().is_empty() {
    return Ok(None);
  }

  let payload: serde_json::Value =
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")?;
  match payload {
    serde_json::Value::Object(map) => Ok(Some(map)),
    _ => bail!("payload must be a JSON object"),
  }
}
