//! Workflow file: steps plus run options.
//!
//! ```json
//! {
//!   "seed_model": "model.json",
//!   "results": "results.json",
//!   "steps": [
//!     { "module": "reporting_with_requests", "arguments": { "add_output_json": false } }
//!   ],
//!   "run_options": { "mode": "classic" }
//! }
//! ```
//!
//! Relative paths resolve against the workflow file's directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use measure_core::RawArguments;

use crate::error::{Result, RunnerError};

/// How hooks are sequenced around translation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Output-request hooks and `run` only.
    Classic,
    /// Pre-translation hooks, then output-request hooks, then `run`.
    #[default]
    Labs,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Classic => "classic",
            RunMode::Labs => "labs",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(RunMode::Classic),
            "labs" => Ok(RunMode::Labs),
            other => Err(format!("unknown run mode: {other}")),
        }
    }
}

fn default_max_parallel_jobs() -> usize {
    1
}

/// Options that change how a workflow runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(default)]
    pub mode: RunMode,

    /// Skip pre-translation hooks even in labs mode.
    #[serde(default)]
    pub skip_pre_translation: bool,

    /// Accept output requests whose type is not on the safe list.
    #[serde(default)]
    pub allow_unsafe_output_requests: bool,

    /// Skip writing the translated model and engine input.
    #[serde(default)]
    pub fast: bool,

    /// Flush counters and keep per-step working directories.
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_max_parallel_jobs")]
    pub max_parallel_jobs: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            skip_pre_translation: false,
            allow_unsafe_output_requests: false,
            fast: false,
            debug: false,
            max_parallel_jobs: default_max_parallel_jobs(),
        }
    }
}

impl RunOptions {
    /// Whether pre-translation hooks run under these options.
    pub fn runs_pre_translation(&self) -> bool {
        self.mode == RunMode::Labs && !self.skip_pre_translation
    }
}

/// One module invocation in a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Registry id of the module.
    pub module: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub arguments: RawArguments,
}

impl WorkflowStep {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: None,
            arguments: RawArguments::new(),
        }
    }

    pub fn with_argument(mut self, key: &str, value: serde_json::Value) -> Self {
        self.arguments.insert(key.to_string(), value);
        self
    }

    /// Step name, falling back to the module id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.module)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_model: Option<PathBuf>,

    /// Results of the external simulation, read by `run` steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_directory: Option<PathBuf>,

    pub steps: Vec<WorkflowStep>,

    #[serde(default)]
    pub run_options: RunOptions,
}

impl Workflow {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Read a workflow file and resolve its relative paths.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RunnerError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let mut workflow = Self::from_json(&text).map_err(|source| RunnerError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if workflow.steps.is_empty() {
            return Err(RunnerError::EmptyWorkflow);
        }

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        workflow.resolve_paths(base);
        if workflow.run_directory.is_none() {
            workflow.run_directory = Some(base.join("run"));
        }
        tracing::debug!(path = %path.display(), steps = workflow.steps.len(), "workflow loaded");
        Ok(workflow)
    }

    /// Make every relative path absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for slot in [&mut self.seed_model, &mut self.results, &mut self.run_directory] {
            if let Some(p) = slot.as_mut() {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        }
    }
}
