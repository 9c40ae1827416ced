//! The module contract: descriptor, optional hooks and the execution step.
//!
//! Optional hooks are capability objects: a module that supports one returns
//! `Some(self)` from the matching accessor, and the orchestrator may detect
//! and skip them.

use std::borrow::Cow;

use async_trait::async_trait;

use crate::argument::{ArgumentSpec, ArgumentValues, RawArguments};
use crate::capability::{ModelHandle, ReportingConfig};
use crate::context::RunContext;
use crate::error::{ModuleError, ValidationError};
use crate::output::OutputSpec;
use crate::request::EngineOutputRequest;
use crate::validate::validate;

/// Context available when a module declares its arguments.
///
/// The model may be absent; `arguments` must still return a usable schema.
#[derive(Clone, Copy, Default)]
pub struct ArgumentContext<'a> {
    model: Option<&'a dyn ModelHandle>,
}

impl<'a> ArgumentContext<'a> {
    pub fn empty() -> Self {
        Self { model: None }
    }

    pub fn with_model(model: &'a dyn ModelHandle) -> Self {
        Self { model: Some(model) }
    }

    pub fn from_option(model: Option<&'a dyn ModelHandle>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> Option<&'a dyn ModelHandle> {
        self.model
    }
}

/// A pluggable analysis/transform unit.
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn modeler_description(&self) -> &str;

    /// Ordered argument schema. Must have no side effects.
    fn arguments(&self, context: &ArgumentContext<'_>) -> Vec<ArgumentSpec>;

    /// Outputs this module may register during `run`.
    fn outputs(&self) -> Vec<OutputSpec> {
        Vec::new()
    }

    fn pre_translation(&self) -> Option<&dyn PreTranslationHook> {
        None
    }

    fn output_requests(&self) -> Option<&dyn OutputRequestHook> {
        None
    }

    /// The main step. Required collaborators and arguments have already been
    /// checked by the driver when this is called.
    async fn run(&self, ctx: &mut RunContext<'_>) -> Result<(), ModuleError>;
}

/// Runs before the model is translated to the engine's input format.
///
/// Implementations may only add or change reporting configuration; the hook
/// is handed the model's [`ReportingConfig`] and nothing else.
pub trait PreTranslationHook: Send + Sync {
    fn on_pre_translation(
        &self,
        reporting: &mut dyn ReportingConfig,
        values: &ArgumentValues,
    ) -> Result<(), ModuleError>;
}

/// Runs after translation and before simulation, asking for extra engine
/// outputs the module needs later.
pub trait OutputRequestHook: Send + Sync {
    fn on_output_request(
        &self,
        ctx: &OutputRequestContext<'_>,
    ) -> Result<Vec<EngineOutputRequest>, ModuleError>;
}

/// Arguments as handed to an output-request hook.
///
/// Depending on the orchestrator mode the values were either validated
/// already or arrive raw.
#[derive(Clone, Copy, Debug)]
pub enum HookArguments<'a> {
    Validated(&'a ArgumentValues),
    Raw(&'a RawArguments),
}

/// Inputs to [`OutputRequestHook::on_output_request`].
pub struct OutputRequestContext<'a> {
    arguments: HookArguments<'a>,
    model: Option<&'a dyn ModelHandle>,
}

impl<'a> OutputRequestContext<'a> {
    pub fn new(arguments: HookArguments<'a>, model: Option<&'a dyn ModelHandle>) -> Self {
        Self { arguments, model }
    }

    pub fn arguments(&self) -> HookArguments<'a> {
        self.arguments
    }

    pub fn model(&self) -> Option<&'a dyn ModelHandle> {
        self.model
    }

    pub fn argument_context(&self) -> ArgumentContext<'a> {
        ArgumentContext::from_option(self.model)
    }

    /// Validated values, re-running validation against `specs` when the
    /// arguments arrived raw.
    pub fn resolve(&self, specs: &[ArgumentSpec]) -> Result<Cow<'a, ArgumentValues>, ValidationError> {
        match self.arguments {
            HookArguments::Validated(values) => Ok(Cow::Borrowed(values)),
            HookArguments::Raw(raw) => validate(specs, raw).map(Cow::Owned),
        }
    }
}

/// Which optional hooks a module exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct HookSet {
    pub pre_translation: bool,
    pub output_requests: bool,
}

impl HookSet {
    pub fn of(module: &dyn Module) -> Self {
        Self {
            pre_translation: module.pre_translation().is_some(),
            output_requests: module.output_requests().is_some(),
        }
    }
}
