//! Measure Core Library
//!
//! The execution contract for pluggable analysis/transform modules
//! ("measures"): argument schemas and validation, optional lifecycle hooks,
//! capability interfaces over the host model and results store, and the
//! invocation driver that turns every outcome into a [`ModuleResult`].

pub mod argument;
pub mod capability;
pub mod context;
pub mod error;
pub mod fakes;
pub mod invocation;
pub mod metrics;
pub mod module;
pub mod obs;
pub mod output;
pub mod registry;
pub mod report;
pub mod request;
pub mod result;
pub mod run_log;
pub mod telemetry;
pub mod validate;

pub use argument::{ArgumentKind, ArgumentSpec, ArgumentValue, ArgumentValues, RawArguments};

pub use capability::{
    ModelHandle, OutputJson, OutputJsonOption, ReportingConfig, ResultsHandle, ResultsStore,
    TimeSeries, ZoneSummary,
};

pub use context::RunContext;

pub use error::{
    FailureKind, ModuleError, RegistryError, RequestParseError, ResultsError, ValidationError,
};

pub use invocation::{execute, Invocation, InvocationState};

pub use module::{
    ArgumentContext, HookArguments, HookSet, Module, OutputRequestContext, OutputRequestHook,
    PreTranslationHook,
};

pub use output::{sanitize_key, OutputKind, OutputSpec, OutputValue};

pub use registry::ModuleRegistry;

pub use report::{is_report_file, relocated_report_name, report_namespace, REPORTS_DIR};

pub use request::{EngineOutputRequest, ReportingFrequency, SAFE_REQUEST_PREFIXES};

pub use result::{ModuleResult, PastStepValues, StepStatus};

pub use run_log::{LogLevel, LogMessage, RunLog};

pub use validate::{validate, with_defaults};

/// Crate version, for the CLI banner and run summaries.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
