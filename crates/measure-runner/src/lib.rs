//! measure-runner: drive workflows of measure modules.
//!
//! A workflow names a seed model, the results of an external simulation, and
//! an ordered list of module steps. The [`Orchestrator`] runs the hooks of all
//! steps around translation, merges their output requests into the
//! [`EngineInput`], then runs the steps and gathers their reports.

pub mod engine_input;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod reports;
pub mod results;
pub mod workflow;

pub use engine_input::{AcceptSummary, AddOutcome, EngineInput, UNIQUE_OBJECT_TYPES};
pub use error::{Result, RunnerError};
pub use model::{JsonModel, JsonReporting};
pub use orchestrator::{
    Job, Orchestrator, StepOutcome, StepReport, WorkflowOutcome, ENGINE_INPUT_FILE,
    IN_MODEL_FILE, OUT_MODEL_FILE, SUMMARY_FILE,
};
pub use reports::gather_reports;
pub use results::{JsonResultsStore, ResultsFile};
pub use workflow::{RunMode, RunOptions, Workflow, WorkflowStep};
