mod command;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, prelude::*};

use appraise_config::{Settings, WorkflowDef};
use appraise_engine::{Coordinator, WorkflowStatus};
use appraise_registry::SharedRegistry;
use appraise_task::{Provider, Task};

use crate::command::CommandProvider;

/// Appraise - a workflow coordinator for property appraisal agents
#[derive(Parser)]
#[command(name = "appraise")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the settings file (default: ~/.appraise/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow or task
  Run {
    #[command(subcommand)]
    target: RunTarget,
  },

  /// List registered providers and their capabilities
  Providers,
}

#[derive(Subcommand)]
enum RunTarget {
  /// Run an entire workflow
  Workflow {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Run a single task from a workflow
  Task {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Index of the task in the workflow's task list
    #[arg(long)]
    task: usize,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    )
    .init();

  let config_path = match cli.config {
    Some(path) => path,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".appraise")
      .join("config.json"),
  };

  match cli.command {
    Some(Commands::Run { target }) => {
      let rt = tokio::runtime::Runtime::new()?;
      match target {
        RunTarget::Workflow { workflow_file } => {
          rt.block_on(run_workflow(&workflow_file, &config_path))?;
        }
        RunTarget::Task {
          workflow_file,
          task,
        } => {
          rt.block_on(run_task(&workflow_file, task, &config_path))?;
        }
      }
    }
    Some(Commands::Providers) => {
      list_providers(&config_path)?;
    }
    None => {
      println!("appraise - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_settings(config_path: &Path) -> Result<Settings> {
  Settings::load_or_default(config_path)
    .with_context(|| format!("failed to load settings: {}", config_path.display()))
}

fn build_coordinator(settings: Settings) -> Coordinator {
  let registry = SharedRegistry::default();
  for def in settings.providers {
    registry.register(Arc::new(CommandProvider::new(def)));
  }
  Coordinator::new(registry, settings.engine)
}

async fn load_workflow(workflow_file: &Path) -> Result<WorkflowDef> {
  let content = tokio::fs::read_to_string(workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))
}

async fn run_workflow(workflow_file: &Path, config_path: &Path) -> Result<()> {
  let settings = load_settings(config_path)?;
  let workflow_def = load_workflow(workflow_file).await?;
  eprintln!("Loaded workflow: {}", workflow_def.name);

  let workflow = appraise_workflow::resolve(workflow_def).context("invalid workflow")?;
  eprintln!("Resolved workflow with {} tasks", workflow.tasks.len());

  let coordinator = build_coordinator(settings);
  let result = coordinator
    .run_workflow(workflow)
    .await
    .context("workflow was rejected")?;

  eprintln!(
    "Workflow {} finished as {:?} after {} rounds",
    result.workflow_id, result.status, result.rounds
  );
  println!("{}", serde_json::to_string_pretty(&result)?);

  if result.status == WorkflowStatus::Failed {
    anyhow::bail!("workflow failed");
  }
  Ok(())
}

async fn run_task(workflow_file: &Path, index: usize, config_path: &Path) -> Result<()> {
  let settings = load_settings(config_path)?;
  let workflow_def = load_workflow(workflow_file).await?;
  let workflow = appraise_workflow::resolve(workflow_def).context("invalid workflow")?;

  let definition = workflow
    .tasks
    .get(index)
    .with_context(|| format!("task {} not found in workflow", index))?;
  let template = &definition.template;

  eprintln!("Running task {} (type: {})", index, template.task_type);

  let payload = read_payload_from_stdin()?.unwrap_or_else(|| template.payload.clone());

  let task = Task::with_id(workflow.task_id(index), &template.task_type, payload)
    .priority(template.priority)
    .requester(&settings.engine.requester)
    .deadline(template.deadline)
    .context(&workflow.context_id)
    .metadata(template.metadata.clone());

  let coordinator = build_coordinator(settings);
  let result = coordinator.execute_task(task).await;

  eprintln!("Task finished as {:?} by {}", result.status, result.provider_id);
  println!("{}", serde_json::to_string_pretty(&result)?);

  Ok(())
}

fn list_providers(config_path: &Path) -> Result<()> {
  let settings = load_settings(config_path)?;
  let coordinator = build_coordinator(settings);
  let registry = coordinator.registry();

  for provider in registry.providers() {
    println!(
      "{}\t{}\t{}",
      provider.id(),
      provider.name(),
      provider.capabilities().join(",")
    );
  }
  eprintln!("Known task types: {}", registry.capabilities().join(", "));

  Ok(())
}

/// Payload piped on stdin, if any.
fn read_payload_from_stdin() -> Result<Option<serde_json::Value>> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(None);
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(None)
  } else {
    serde_json::from_str(&input)
      .map(Some)
      .context("failed to parse payload JSON from stdin")
  }
}
