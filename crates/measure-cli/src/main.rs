//! measurekit CLI
//!
//! The `measure` command inspects registered modules and runs workflows.
//!
//! ## Commands
//!
//! - `list`: Registered module ids
//! - `describe`: Argument schema, outputs and hooks of one module
//! - `validate`: Check arguments against a module's schema
//! - `requests`: Output requests a module would make
//! - `run`: Run one or more workflow files

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use measure_core::{
    registry, validate, with_defaults, ArgumentContext, HookArguments, HookSet, ModelHandle,
    OutputRequestContext, RawArguments,
};
use measure_runner::{Job, JsonModel, Orchestrator, RunMode, Workflow, WorkflowOutcome};

#[derive(Parser)]
#[command(name = "measure")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run building-simulation measures and workflows", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, env = "MEASURE_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered modules
    List,

    /// Show a module's arguments, outputs and hooks
    Describe {
        /// Module id
        id: String,

        /// Model used to build model-dependent argument choices
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Validate arguments for a module
    Validate {
        /// Module id
        id: String,

        /// Argument as key=value (value parsed as JSON, else taken as a string)
        #[arg(short, long = "arg", value_parser = parse_argument)]
        args: Vec<(String, Value)>,

        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Print the output requests a module would make
    Requests {
        /// Module id
        id: String,

        #[arg(short, long = "arg", value_parser = parse_argument)]
        args: Vec<(String, Value)>,

        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Run workflow files
    Run {
        /// Workflow files (JSON)
        #[arg(required = true)]
        workflows: Vec<PathBuf>,

        /// Run directory (single workflow only; default: <workflow dir>/run)
        #[arg(long, env = "MEASURE_RUN_DIR")]
        run_dir: Option<PathBuf>,

        /// Override the workflow's run mode (classic or labs)
        #[arg(long)]
        mode: Option<RunMode>,

        /// Skip writing the translated model and engine input
        #[arg(long)]
        fast: bool,

        /// Skip pre-translation hooks
        #[arg(long)]
        skip_pre_translation: bool,

        /// Accept output requests of potentially unsafe types
        #[arg(long)]
        allow_unsafe: bool,

        /// Keep per-step working directories and flush counters
        #[arg(long)]
        debug: bool,
        /// Maximum workflows run at once; a workflow's own max_parallel_jobs may raise it
        /// Maximum workflows run at once
        #[arg(short, long, default_value = "1")]
        jobs: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn parse_argument(s: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("argument '{s}' has an empty key"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    measure_core::telemetry::init_tracing(cli.json || cli.log_format == LogFormat::Json, level);

    registry::init(measure_builtins::default_registry()?)
        .context("Failed to initialize module registry")?;

    let result = match cli.command {
        Commands::List => cmd_list(),
        Commands::Describe { id, model } => cmd_describe(&id, model.as_deref()).await,
        Commands::Validate { id, args, model } => cmd_validate(&id, args, model.as_deref()).await,
        Commands::Requests { id, args, model } => cmd_requests(&id, args, model.as_deref()).await,
        Commands::Run {
            workflows,
            run_dir,
            mode,
            fast,
            skip_pre_translation,
            allow_unsafe,
            debug,
            jobs,
        } => {
            let overrides = RunOverrides {
                mode,
                fast,
                skip_pre_translation,
                allow_unsafe,
                debug,
            };
            cmd_run(&workflows, run_dir, overrides, jobs).await
        }
    };

    registry::teardown();
    result
}

async fn load_model(path: Option<&Path>) -> Result<Option<JsonModel>> {
    match path {
        Some(path) => {
            let model = JsonModel::load(path)
                .await
                .context(format!("Failed to load model: {:?}", path))?;
            Ok(Some(model))
        }
        None => Ok(None),
    }
}

/// List registered modules
fn cmd_list() -> Result<()> {
    registry::with_registry(|registry| {
        for (id, module) in registry.iter() {
            let hooks = HookSet::of(module.as_ref());
            let mut flags = Vec::new();
            if hooks.pre_translation {
                flags.push("pre-translation");
            }
            if hooks.output_requests {
                flags.push("output-requests");
            }
            println!("{:<28} {} [{}]", id, module.name(), flags.join(", "));
        }
    })?;
    Ok(())
}

/// Describe one module as JSON
async fn cmd_describe(id: &str, model_path: Option<&Path>) -> Result<()> {
    let module = registry::lookup(id)?;
    let model = load_model(model_path).await?;
    let context = ArgumentContext::from_option(model.as_ref().map(|m| m as &dyn ModelHandle));
    let hooks = HookSet::of(module.as_ref());

    let description = json!({
        "id": id,
        "name": module.name(),
        "description": module.description(),
        "modeler_description": module.modeler_description(),
        "hooks": {
            "pre_translation": hooks.pre_translation,
            "output_requests": hooks.output_requests,
        },
        "arguments": module.arguments(&context),
        "outputs": module.outputs(),
    });
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}

/// Validate arguments and print the typed values
async fn cmd_validate(id: &str, args: Vec<(String, Value)>, model_path: Option<&Path>) -> Result<()> {
    let module = registry::lookup(id)?;
    let model = load_model(model_path).await?;
    let context = ArgumentContext::from_option(model.as_ref().map(|m| m as &dyn ModelHandle));

    let specs = module.arguments(&context);
    let supplied: RawArguments = args.into_iter().collect();
    let values = validate(&specs, &with_defaults(&specs, &supplied))
        .context(format!("Arguments for '{}' are invalid", id))?;

    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

/// Print a module's output requests in engine text form
async fn cmd_requests(id: &str, args: Vec<(String, Value)>, model_path: Option<&Path>) -> Result<()> {
    let module = registry::lookup(id)?;
    let Some(hook) = module.output_requests() else {
        println!("'{}' makes no output requests", id);
        return Ok(());
    };
    let model = load_model(model_path).await?;
    let model_ref = model.as_ref().map(|m| m as &dyn ModelHandle);

    let specs = module.arguments(&ArgumentContext::from_option(model_ref));
    let supplied: RawArguments = args.into_iter().collect();
    let raw = with_defaults(&specs, &supplied);
    let requests = hook
        .on_output_request(&OutputRequestContext::new(HookArguments::Raw(&raw), model_ref))
        .context(format!("Output request hook of '{}' failed", id))?;

    for request in &requests {
        println!("{}", request);
    }
    Ok(())
}

/// Command-line overrides of a workflow's run options.
struct RunOverrides {
    mode: Option<RunMode>,
    fast: bool,
    skip_pre_translation: bool,
    allow_unsafe: bool,
    debug: bool,
}

impl RunOverrides {
    fn apply(&self, workflow: &mut Workflow) {
        let options = &mut workflow.run_options;
        if let Some(mode) = self.mode {
            options.mode = mode;
        }
        options.fast |= self.fast;
        options.skip_pre_translation |= self.skip_pre_translation;
        options.allow_unsafe_output_requests |= self.allow_unsafe;
        options.debug |= self.debug;
    }
}

/// Run workflows and print a line per workflow
async fn cmd_run(
    paths: &[PathBuf],
    run_dir: Option<PathBuf>,
    overrides: RunOverrides,
    max_jobs: usize,
) -> Result<()> {
    if run_dir.is_some() && paths.len() > 1 {
        anyhow::bail!("--run-dir can only be used with a single workflow");
    }

    let mut jobs = Vec::with_capacity(paths.len());
    for path in paths {
        let mut workflow = Workflow::load(path)
            .await
            .context(format!("Failed to load workflow: {:?}", path))?;
        overrides.apply(&mut workflow);
        let job = match &run_dir {
            Some(dir) => Job::new(workflow, dir),
            None => Job::from_workflow(workflow),
        };
        jobs.push(job);
    }

    let orchestrator = Orchestrator::new(registry::global()?).with_max_parallel_jobs(max_jobs);
    info!(workflows = jobs.len(), max_jobs = orchestrator.parallelism_for(&jobs), "running workflows");
    let outcomes = orchestrator.run_jobs(jobs).await;

    let mut failed = 0;
    for (path, outcome) in paths.iter().zip(outcomes) {
        match outcome {
            Ok(outcome) => {
                print_outcome(path, &outcome);
                if !outcome.success {
                    failed += 1;
                }
            }
            Err(e) => {
                println!("{}: error: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} workflows failed", failed, paths.len());
    }
    Ok(())
}

fn print_outcome(path: &Path, outcome: &WorkflowOutcome) {
    let status = if outcome.success { "ok" } else { "FAILED" };
    println!(
        "{}: {} ({} steps, {} ms) -> {}",
        path.display(),
        status,
        outcome.steps.len(),
        outcome.duration_ms(),
        outcome.run_dir.display()
    );
    for step in &outcome.steps {
        println!("  [{:03}] {:<32} {:?}", step.index, step.name, step.outcome);
        if let Some(result) = &step.result {
            for error in result.errors() {
                println!("        error: {}", error);
            }
        }
    }
    for rejected in &outcome.requests.rejected {
        println!("  rejected request: {}", rejected);
    }
}
