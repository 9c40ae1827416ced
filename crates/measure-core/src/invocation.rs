//! Per-invocation state machine and driver.
//!
//! ```text
//! Created -> Validating -> Validated -> Running -> Succeeded
//!    |           |            |            |
//!    +-----------+------------+------------+------> Failed
//! ```
//!
//! `Succeeded` and `Failed` are terminal. The driver never retries; a retry
//! is a new [`Invocation`].

use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::Path;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tracing::{warn, Instrument};
use uuid::Uuid;

use crate::argument::{ArgumentValues, RawArguments};
use crate::capability::{ModelHandle, ResultsStore};
use crate::context::RunContext;
use crate::error::{FailureKind, ModuleError};
use crate::metrics::METRICS;
use crate::module::{ArgumentContext, HookArguments, Module, OutputRequestContext};
use crate::obs::{self, InvocationSpan};
use crate::output::{OutputKind, OutputSpec, OutputValue};
use crate::request::EngineOutputRequest;
use crate::result::{ModuleResult, PastStepValues, StepStatus};
use crate::run_log::{LogLevel, LogMessage};
use crate::validate::validate;

/// Lifecycle state of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    Created,
    Validating,
    Validated,
    Running,
    Succeeded,
    Failed,
}

impl InvocationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Validating => "validating",
            Self::Validated => "validated",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether the machine may move from `self` to `to`.
    pub fn can_transition_to(&self, to: InvocationState) -> bool {
        use InvocationState::*;
        matches!(
            (self, to),
            (Created, Validating)
                | (Validating, Validated)
                | (Validated, Running)
                | (Running, Succeeded)
                | (Created | Validating | Validated | Running, Failed)
        )
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid(from: InvocationState, to: impl Into<String>) -> ModuleError {
    ModuleError::InvalidTransition {
        from: from.to_string(),
        to: to.into(),
    }
}

/// One call of a module: raw arguments in, [`ModuleResult`] out.
pub struct Invocation<'m> {
    id: Uuid,
    module: &'m dyn Module,
    raw: RawArguments,
    values: Option<ArgumentValues>,
    state: InvocationState,
    pre_translation_ran: bool,
    /// Why the invocation failed before `run`, replayed by `run`.
    early_failure: Option<(FailureKind, String)>,
    past_steps: PastStepValues,
}

impl<'m> Invocation<'m> {
    pub fn new(module: &'m dyn Module, raw: RawArguments) -> Self {
        Self {
            id: Uuid::new_v4(),
            module,
            raw,
            values: None,
            state: InvocationState::Created,
            pre_translation_ran: false,
            early_failure: None,
            past_steps: PastStepValues::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn module(&self) -> &'m dyn Module {
        self.module
    }

    pub fn raw(&self) -> &RawArguments {
        &self.raw
    }

    /// Hand the invocation what earlier workflow steps registered, for
    /// [`RunContext::past_step_values`].
    pub fn set_past_steps(&mut self, past: PastStepValues) {
        self.past_steps = past;
    }

    pub fn past_steps(&self) -> &PastStepValues {
        &self.past_steps
    }

    /// Validated values, once validation has succeeded.
    pub fn values(&self) -> Option<&ArgumentValues> {
        self.values.as_ref()
    }

    fn transition(&mut self, to: InvocationState) -> Result<(), ModuleError> {
        if !self.state.can_transition_to(to) {
            return Err(invalid(self.state, to.as_str()));
        }
        obs::emit_state_transition(&self.id.to_string(), self.state.as_str(), to.as_str());
        self.state = to;
        Ok(())
    }

    /// Move to `Failed`, remembering `err` for a later `run`.
    fn fail(&mut self, err: ModuleError) -> ModuleError {
        if self.early_failure.is_none() {
            self.early_failure = Some((err.kind(), err.to_string()));
        }
        if !self.state.is_terminal() {
            let _ = self.transition(InvocationState::Failed);
        }
        err
    }

    /// Validate the raw arguments against the schema the module declares for
    /// `context`.
    ///
    /// Allowed from `Created`, and again from `Validated` so the run step can
    /// re-check against the model it actually receives.
    pub fn validate(&mut self, context: &ArgumentContext<'_>) -> Result<&ArgumentValues, ModuleError> {
        match self.state {
            InvocationState::Created => self.transition(InvocationState::Validating)?,
            InvocationState::Validated => {}
            other => return Err(invalid(other, InvocationState::Validating.as_str())),
        }

        let specs = self.module.arguments(context);
        match validate(&specs, &self.raw) {
            Ok(values) => {
                if self.state == InvocationState::Validating {
                    self.transition(InvocationState::Validated)?;
                }
                Ok(&*self.values.insert(values))
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Run the module's pre-translation hook against `model`.
    ///
    /// Returns `Ok(false)` when the module has no such hook or it already
    /// ran for this invocation. Validates first if that has not happened.
    pub fn pre_translation(&mut self, model: &mut dyn ModelHandle) -> Result<bool, ModuleError> {
        let module = self.module;
        let Some(hook) = module.pre_translation() else {
            return Ok(false);
        };
        if self.pre_translation_ran {
            tracing::debug!(module = %module.name(), "pre-translation already ran");
            return Ok(false);
        }
        if self.state == InvocationState::Created {
            self.validate(&ArgumentContext::with_model(&*model))?;
        }
        let values = match (&self.values, self.state) {
            (Some(values), InvocationState::Validated) => values,
            _ => return Err(invalid(self.state, "pre_translation")),
        };

        let outcome = hook.on_pre_translation(model.reporting_mut(), values);
        self.pre_translation_ran = true;
        if let Err(err) = outcome {
            return Err(self.fail(err));
        }
        Ok(true)
    }

    /// Ask the module for extra engine outputs.
    ///
    /// Works whether or not pre-translation ran: the hook receives validated
    /// values when they exist and the raw map otherwise.
    pub fn output_requests(
        &self,
        model: Option<&dyn ModelHandle>,
    ) -> Result<Vec<EngineOutputRequest>, ModuleError> {
        let Some(hook) = self.module.output_requests() else {
            return Ok(Vec::new());
        };
        if self.state.is_terminal() || self.state == InvocationState::Running {
            return Err(invalid(self.state, "output_requests"));
        }
        let arguments = match &self.values {
            Some(values) => HookArguments::Validated(values),
            None => HookArguments::Raw(&self.raw),
        };
        let requests = hook.on_output_request(&OutputRequestContext::new(arguments, model))?;
        obs::emit_output_requests(self.module.name(), requests.len());
        Ok(requests)
    }

    /// Execute the module. Every failure, including a panic inside the
    /// module, comes back as a failed [`ModuleResult`].
    pub async fn run(
        &mut self,
        model: Option<&mut dyn ModelHandle>,
        results: Option<&dyn ResultsStore>,
        work_dir: &Path,
    ) -> ModuleResult {
        let span = InvocationSpan::new(&self.id.to_string(), self.module.name());
        self.run_inner(model, results, work_dir)
            .instrument(span.into_inner())
            .await
    }

    async fn run_inner(
        &mut self,
        model: Option<&mut dyn ModelHandle>,
        results: Option<&dyn ResultsStore>,
        work_dir: &Path,
    ) -> ModuleResult {
        let started_at = Utc::now();
        METRICS.inc_invocations();
        obs::emit_invocation_started(&self.id.to_string(), self.module.name());

        let Some(model) = model else {
            return self.finish_early(ModuleError::MissingModel, started_at);
        };
        let Some(results) = results else {
            return self.finish_early(ModuleError::MissingResults, started_at);
        };
        if let Some((kind, text)) = self.early_failure.clone() {
            return self.finish(
                StepStatus::Fail,
                Some(kind),
                vec![LogMessage {
                    level: LogLevel::Error,
                    text,
                }],
                BTreeMap::new(),
                Vec::new(),
                started_at,
            );
        }
        if self.state.is_terminal() || self.state == InvocationState::Running {
            let err = invalid(self.state, InvocationState::Running.as_str());
            return self.finish_early(err, started_at);
        }
        let values = match self.validate(&ArgumentContext::with_model(&*model)) {
            Ok(values) => values.clone(),
            Err(err) => return self.finish_early(err, started_at),
        };
        if let Err(err) = self.transition(InvocationState::Running) {
            return self.finish_early(err, started_at);
        }

        let module = self.module;
        let mut ctx = RunContext::new(
            module.name(),
            &values,
            &self.past_steps,
            model,
            results,
            work_dir,
        );
        let outcome = AssertUnwindSafe(module.run(&mut ctx)).catch_unwind().await;
        let (log, reports) = ctx.into_parts();
        let (mut messages, registered, not_applicable) = log.into_parts();

        let failure = match outcome {
            Ok(Ok(())) if messages.iter().any(|m| m.level == LogLevel::Error) => {
                Some(FailureKind::Execution)
            }
            Ok(Ok(())) => None,
            Ok(Err(err)) => {
                tracing::error!(module = %module.name(), error = %err, "module run failed");
                messages.push(error_message(&err));
                Some(err.kind())
            }
            Err(payload) => {
                let text = format!("module panicked: {}", panic_message(payload.as_ref()));
                tracing::error!(module = %module.name(), "{}", text);
                messages.push(LogMessage {
                    level: LogLevel::Error,
                    text,
                });
                Some(FailureKind::Execution)
            }
        };

        let status = match (&failure, not_applicable) {
            (Some(_), _) => StepStatus::Fail,
            (None, true) => StepStatus::NotApplicable,
            (None, false) => StepStatus::Success,
        };
        let next = if failure.is_some() {
            InvocationState::Failed
        } else {
            InvocationState::Succeeded
        };
        // Running always reaches either terminal state.
        let _ = self.transition(next);

        let values_out = filter_outputs(module.name(), &module.outputs(), registered);
        self.finish(status, failure, messages, values_out, reports, started_at)
    }

    fn finish_early(&mut self, err: ModuleError, started_at: DateTime<Utc>) -> ModuleResult {
        tracing::error!(module = %self.module.name(), error = %err, "invocation failed before run");
        let message = error_message(&err);
        let kind = err.kind();
        if !self.state.is_terminal() {
            self.fail(err);
        }
        self.finish(
            StepStatus::Fail,
            Some(kind),
            vec![message],
            BTreeMap::new(),
            Vec::new(),
            started_at,
        )
    }

    fn finish(
        &self,
        status: StepStatus,
        failure: Option<FailureKind>,
        messages: Vec<LogMessage>,
        values: BTreeMap<String, OutputValue>,
        reports: Vec<std::path::PathBuf>,
        started_at: DateTime<Utc>,
    ) -> ModuleResult {
        let result = ModuleResult {
            invocation_id: self.id,
            module_name: self.module.name().to_string(),
            status,
            failure,
            arguments_digest: self.values.as_ref().map(ArgumentValues::digest),
            arguments: self.values.clone(),
            messages,
            values,
            reports,
            started_at,
            completed_at: Utc::now(),
        };
        if status == StepStatus::Fail {
            METRICS.inc_failures();
        }
        obs::emit_invocation_finished(&self.id.to_string(), status.as_str(), result.duration_ms());
        result
    }
}

/// Create an invocation and run it in one go.
pub async fn execute(
    module: &dyn Module,
    raw: RawArguments,
    model: Option<&mut dyn ModelHandle>,
    results: Option<&dyn ResultsStore>,
    work_dir: &Path,
) -> ModuleResult {
    Invocation::new(module, raw).run(model, results, work_dir).await
}

fn error_message(err: &ModuleError) -> LogMessage {
    LogMessage {
        level: LogLevel::Error,
        text: err.to_string(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Keep registered values that match a declared output.
///
/// A module that declares no outputs keeps everything it registered.
/// Integers reported under a double output are widened.
fn filter_outputs(
    module: &str,
    outputs: &[OutputSpec],
    registered: Vec<(String, OutputValue)>,
) -> BTreeMap<String, OutputValue> {
    if outputs.is_empty() {
        return registered.into_iter().collect();
    }
    let mut kept = BTreeMap::new();
    for (name, value) in registered {
        match outputs.iter().find(|o| o.name == name) {
            Some(spec) if spec.accepts(&value) => {
                let value = match (spec.kind, value) {
                    (OutputKind::Double, OutputValue::Integer(i)) => OutputValue::Double(i as f64),
                    (_, v) => v,
                };
                kept.insert(name, value);
            }
            Some(spec) => {
                warn!(module = %module, output = %name, expected = ?spec.kind, "registered value has the wrong type, dropped");
            }
            None => {
                warn!(module = %module, output = %name, "registered value is not a declared output, dropped");
            }
        }
    }
    kept
}
