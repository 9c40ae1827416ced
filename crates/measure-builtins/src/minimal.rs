//! A reporting measure that declares only the mandatory lifecycle methods
//! and keeps both hooks as no-ops.

use async_trait::async_trait;

use measure_core::{
    ArgumentContext, ArgumentSpec, ArgumentValues, EngineOutputRequest, Module, ModuleError,
    OutputRequestContext, OutputRequestHook, PreTranslationHook, ReportingConfig, RunContext,
};

pub struct MinimalReporting;

impl MinimalReporting {
    pub const ID: &'static str = "minimal_reporting";
}

#[async_trait]
impl Module for MinimalReporting {
    fn name(&self) -> &str {
        "Minimal Reporting"
    }

    fn description(&self) -> &str {
        "Reporting measure with empty hooks"
    }

    fn modeler_description(&self) -> &str {
        "Declares no arguments, requests nothing and registers nothing"
    }

    fn arguments(&self, _context: &ArgumentContext<'_>) -> Vec<ArgumentSpec> {
        Vec::new()
    }

    fn pre_translation(&self) -> Option<&dyn PreTranslationHook> {
        Some(self)
    }

    fn output_requests(&self) -> Option<&dyn OutputRequestHook> {
        Some(self)
    }

    async fn run(&self, _ctx: &mut RunContext<'_>) -> Result<(), ModuleError> {
        Ok(())
    }
}

impl PreTranslationHook for MinimalReporting {
    fn on_pre_translation(
        &self,
        _reporting: &mut dyn ReportingConfig,
        _values: &ArgumentValues,
    ) -> Result<(), ModuleError> {
        Ok(())
    }
}

impl OutputRequestHook for MinimalReporting {
    fn on_output_request(
        &self,
        _ctx: &OutputRequestContext<'_>,
    ) -> Result<Vec<EngineOutputRequest>, ModuleError> {
        Ok(Vec::new())
    }
}
