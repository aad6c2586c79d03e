use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trellis_config::ProcessConfig;
use trellis_engine::{Engine, EngineConfig};
use trellis_stdlib::StandardProvider;

/// Trellis - a declarative process engine
#[derive(Parser)]
#[command(name = "trellis")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to an engine config file (JSON)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the callable registry and type graph as JSON
  Spec,

  /// Compile a process and print its listing
  Compile {
    /// Path to the process file (JSON)
    process_file: PathBuf,
  },

  /// Compile and invoke a process
  Run {
    /// Path to the process file (JSON)
    process_file: PathBuf,

    /// Arguments as a JSON array; read from stdin when omitted
    #[arg(long)]
    args: Option<String>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let config = load_engine_config(cli.config.as_deref())?;

  match cli.command {
    Some(Commands::Spec) => {
      let engine = build_engine(config)?;
      println!("{}", serde_json::to_string_pretty(&engine.export())?);
    }
    Some(Commands::Compile { process_file }) => {
      let engine = build_engine(config)?;
      let process = read_process(&process_file)?;
      let unit = engine
        .compile(&process)
        .with_context(|| format!("failed to compile {}", process_file.display()))?;
      print!("{}", unit.listing());
    }
    Some(Commands::Run { process_file, args }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { run_process(config, process_file, args).await })?;
    }
    None => {
      println!("trellis - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
  let Some(path) = path else {
    return Ok(EngineConfig::default());
  };
  let text = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read config file: {}", path.display()))?;
  EngineConfig::from_json(&text)
    .with_context(|| format!("failed to parse config file: {}", path.display()))
}

fn build_engine(config: EngineConfig) -> Result<Engine> {
  Engine::builder(config)
    .with_provider(Arc::new(StandardProvider::new()))
    .context("failed to register the standard provider")?
    .build()
    .context("failed to build the engine")
}

fn read_process(path: &Path) -> Result<ProcessConfig> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read process file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse process file: {}", path.display()))
}

async fn run_process(config: EngineConfig, process_file: PathBuf, args: Option<String>) -> Result<()> {
  let engine = build_engine(config)?;
  let process = read_process(&process_file)?;

  let args = match args {
    Some(text) => serde_json::from_str(&text).context("failed to parse --args JSON")?,
    None => read_args_from_stdin()?,
  };
  let args = match args {
    serde_json::Value::Array(items) => items,
    other => anyhow::bail!("arguments must be a JSON array, got {}", other),
  };

  engine.start()?;
  let result = engine.invoke_json(&process, &args).await;
  engine.shutdown().await?;
  let result = result.context("process invocation failed")?;

  eprintln!("Execution completed: {}", result.execution_id);

  let actions: serde_json::Map<String, serde_json::Value> = result
    .context
    .outputs()
    .into_iter()
    .filter(|(coordinates, _)| !coordinates.is_initial())
    .map(|(coordinates, value)| (coordinates.to_string(), value.to_json()))
    .collect();

  let output = serde_json::json!({
    "execution_id": result.execution_id,
    "output": result.output.as_ref().map(|v| v.to_json()),
    "actions": actions,
  });
  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(())
}

fn read_args_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(serde_json::json!([]));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read arguments from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!([]))
  } else {
    serde_json::from_str(&input).context("failed to parse arguments JSON from stdin")
  }
}
