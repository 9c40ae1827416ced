//! Workflow orchestration.
//!
//! One job runs one workflow:
//!
//! 1. resolve every step's module from the registry
//! 2. validate arguments (after seeding declared defaults)
//! 3. labs mode: pre-translation hooks of all steps
//! 4. translate the model's reporting settings into the engine input
//! 5. output-request hooks of all steps, merged into the engine input
//! 6. (external simulation)
//! 7. run steps in order; a failed step skips the rest
//! 8. gather reports and write `out.json`
//!
//! Jobs are independent and may run concurrently.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use measure_core::metrics::METRICS;
use measure_core::{
    report_namespace, with_defaults, ArgumentContext, Invocation, ModelHandle, Module,
    ModuleRegistry, ModuleResult, PastStepValues, ResultsStore, StepStatus, REPORTS_DIR, VERSION,
};

use crate::engine_input::{AcceptSummary, EngineInput};
use crate::error::RunnerError;
use crate::model::JsonModel;
use crate::reports::gather_reports;
use crate::results::JsonResultsStore;
use crate::workflow::{RunMode, Workflow, WorkflowStep};

pub const SUMMARY_FILE: &str = "out.json";
pub const ENGINE_INPUT_FILE: &str = "engine_input.txt";
pub const IN_MODEL_FILE: &str = "in_model.json";
pub const OUT_MODEL_FILE: &str = "out_model.json";

/// A workflow bound to its run directory.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub workflow: Workflow,
    pub run_dir: PathBuf,
}

impl Job {
    pub fn new(workflow: Workflow, run_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow,
            run_dir: run_dir.into(),
        }
    }

    /// Use the workflow's own run directory, or `./run`.
    pub fn from_workflow(workflow: Workflow) -> Self {
        let run_dir = workflow
            .run_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("run"));
        Self::new(workflow, run_dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Fail,
    NotApplicable,
    /// Not run because an earlier step failed.
    Skipped,
}

impl From<StepStatus> for StepOutcome {
    fn from(status: StepStatus) -> Self {
        match status {
            StepStatus::Success => StepOutcome::Success,
            StepStatus::Fail => StepOutcome::Fail,
            StepStatus::NotApplicable => StepOutcome::NotApplicable,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub name: String,
    pub module: String,
    pub outcome: StepOutcome,
    /// Output requests the step's hook returned.
    pub output_requests: usize,
    pub result: Option<ModuleResult>,
    /// Gathered report paths.
    pub reports: Vec<PathBuf>,
}

impl StepReport {
    fn skipped(index: usize, step: &WorkflowStep) -> Self {
        Self {
            index,
            name: step.label().to_string(),
            module: step.module.clone(),
            outcome: StepOutcome::Skipped,
            output_requests: 0,
            result: None,
            reports: Vec::new(),
        }
    }
}

/// Summary of one job, written to `out.json`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    pub job_id: Uuid,
    pub version: String,
    pub mode: RunMode,
    pub success: bool,
    pub run_dir: PathBuf,
    pub engine_input_objects: usize,
    pub requests: AcceptSummary,
    pub steps: Vec<StepReport>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl WorkflowOutcome {
    pub fn failed_step(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.outcome == StepOutcome::Fail)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.completed_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), RunnerError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| RunnerError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Runs workflows against a module registry.
pub struct Orchestrator {
    registry: Arc<ModuleRegistry>,
    max_parallel_jobs: usize,
}

impl Orchestrator {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            max_parallel_jobs: 1,
        }
    }

    pub fn with_max_parallel_jobs(mut self, max_parallel_jobs: usize) -> Self {
        self.max_parallel_jobs = max_parallel_jobs.max(1);
        self
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// How many of `jobs` may run at once: the larger of the orchestrator's
    /// limit and any workflow's `max_parallel_jobs` option.
    pub fn parallelism_for(&self, jobs: &[Job]) -> usize {
        jobs.iter()
            .map(|job| job.workflow.run_options.max_parallel_jobs)
            .fold(self.max_parallel_jobs, usize::max)
            .max(1)
    }

    /// Run several jobs, at most [`Self::parallelism_for`] at a time. Results
    /// come back in job order.
    pub async fn run_jobs(&self, jobs: Vec<Job>) -> Vec<anyhow::Result<WorkflowOutcome>> {
        let limit = self.parallelism_for(&jobs);
        debug!(jobs = jobs.len(), limit, "running jobs");
        futures::stream::iter(jobs.into_iter().map(|job| self.run_job(job)))
            .buffered(limit)
            .collect()
            .await
    }

    /// Run one workflow to completion.
    ///
    /// Step failures are recorded in the outcome. An `Err` means the job could
    /// not start or its outputs could not be written.
    pub async fn run_job(&self, job: Job) -> anyhow::Result<WorkflowOutcome> {
        let started_at = Utc::now();
        let Job {
            id,
            workflow,
            run_dir,
        } = job;
        let options = &workflow.run_options;
        info!(job_id = %id, mode = %options.mode, steps = workflow.steps.len(), "workflow started");

        let modules: Vec<Arc<dyn Module>> = workflow
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                self.registry
                    .require(&step.module)
                    .map_err(|source| RunnerError::UnknownStepModule {
                        index,
                        name: step.label().to_string(),
                        source,
                    })
            })
            .collect::<Result<_, _>>()?;

        let mut model = match &workflow.seed_model {
            Some(path) => Some(
                JsonModel::load(path)
                    .await
                    .with_context(|| format!("loading seed model {}", path.display()))?,
            ),
            None => {
                warn!(job_id = %id, "workflow has no seed model");
                None
            }
        };
        let results = workflow.results.as_deref().map(|path| JsonResultsStore::new(path));
        tokio::fs::create_dir_all(&run_dir)
            .await
            .with_context(|| format!("creating run directory {}", run_dir.display()))?;

        let mut invocations: Vec<Invocation<'_>> = workflow
            .steps
            .iter()
            .zip(&modules)
            .map(|(step, module)| {
                let context =
                    ArgumentContext::from_option(model.as_ref().map(|m| m as &dyn ModelHandle));
                let specs = module.arguments(&context);
                Invocation::new(module.as_ref(), with_defaults(&specs, &step.arguments))
            })
            .collect();

        if options.runs_pre_translation() {
            if let Some(model) = model.as_mut() {
                for (inv, step) in invocations.iter_mut().zip(&workflow.steps) {
                    match inv.pre_translation(&mut *model) {
                        Ok(true) => debug!(step = %step.label(), "pre-translation applied"),
                        Ok(false) => {}
                        Err(e) => warn!(step = %step.label(), error = %e, "pre-translation failed"),
                    }
                }
            }
        }

        let mut engine_input = model
            .as_ref()
            .map(|m| EngineInput::translate(m))
            .unwrap_or_default();
        let mut requests = AcceptSummary::default();
        let mut request_counts = vec![0usize; invocations.len()];
        for (index, inv) in invocations.iter().enumerate() {
            match inv.output_requests(model.as_ref().map(|m| m as &dyn ModelHandle)) {
                Ok(batch) => {
                    request_counts[index] = batch.len();
                    let summary = engine_input.accept(
                        inv.module().name(),
                        batch,
                        options.allow_unsafe_output_requests,
                    );
                    requests.absorb(summary);
                }
                Err(e) => warn!(module = %inv.module().name(), error = %e, "output request hook failed"),
            }
        }

        if !options.fast {
            write_file(&run_dir.join(ENGINE_INPUT_FILE), engine_input.render()).await?;
            if let Some(model) = &model {
                let path = run_dir.join(IN_MODEL_FILE);
                model.save(&path).await?;
            }
        }
        info!(job_id = %id, objects = engine_input.len(), rejected = requests.rejected.len(), "engine input ready");

        let reports_dir = run_dir.join(REPORTS_DIR);
        let mut steps = Vec::with_capacity(invocations.len());
        let mut halted = false;
        let mut past_steps = PastStepValues::new();
        for (index, (inv, step)) in invocations.iter_mut().zip(&workflow.steps).enumerate() {
            if halted {
                steps.push(StepReport::skipped(index, step));
                continue;
            }

            let namespace = report_namespace(step.name.as_deref().unwrap_or(inv.module().name()));
            let work_dir = run_dir.join("steps").join(format!("{index:03}_{namespace}"));
            inv.set_past_steps(past_steps.clone());
            let result = inv
                .run(
                    model.as_mut().map(|m| m as &mut dyn ModelHandle),
                    results.as_ref().map(|r| r as &dyn ResultsStore),
                    &work_dir,
                )
                .await;

            let reports = gather_reports(&work_dir, &reports_dir, &namespace)
                .await
                .with_context(|| format!("gathering reports for step {index}"))?;
            if !options.debug && tokio::fs::remove_dir_all(&work_dir).await.is_err() {
                debug!(work_dir = %work_dir.display(), "no working directory to remove");
            }

            past_steps.record_result(
                [step.label(), step.module.as_str(), inv.module().name()],
                &result,
            );

            let outcome = StepOutcome::from(result.status);
            if outcome == StepOutcome::Fail {
                warn!(step = %step.label(), "step failed, skipping remaining steps");
                halted = true;
            }
            steps.push(StepReport {
                index,
                name: step.label().to_string(),
                module: step.module.clone(),
                outcome,
                output_requests: request_counts[index],
                result: Some(result),
                reports,
            });
        }

        if !options.fast {
            if let Some(model) = &model {
                model.save(&run_dir.join(OUT_MODEL_FILE)).await?;
            }
        }

        let outcome = WorkflowOutcome {
            job_id: id,
            version: VERSION.to_string(),
            mode: options.mode,
            success: steps
                .iter()
                .all(|s| matches!(s.outcome, StepOutcome::Success | StepOutcome::NotApplicable)),
            run_dir: run_dir.clone(),
            engine_input_objects: engine_input.len(),
            requests,
            steps,
            started_at,
            completed_at: Utc::now(),
        };
        let summary = serde_json::to_vec_pretty(&outcome).context("serialising workflow summary")?;
        write_file(&run_dir.join(SUMMARY_FILE), summary).await?;

        if options.debug {
            METRICS.flush();
        }
        info!(
            job_id = %id,
            success = outcome.success,
            duration_ms = outcome.duration_ms(),
            "workflow finished"
        );
        Ok(outcome)
    }
}
