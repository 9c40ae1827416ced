//! Drybulb reporting measures.
//!
//! Both read the hourly outdoor drybulb temperature from the results store
//! and write `report.html`. The newer measure also has a pre-translation hook
//! that switches on the engine's structured JSON output; the older one only
//! asks for the variable after translation.

use async_trait::async_trait;
use tracing::debug;

use measure_core::{
    ArgumentContext, ArgumentSpec, ArgumentValues, EngineOutputRequest, Module, ModuleError,
    OutputJson, OutputKind, OutputRequestContext, OutputRequestHook, OutputSpec,
    PreTranslationHook, ReportingConfig, ReportingFrequency, RunContext,
};

use crate::DRYBULB_VARIABLE;

const REPORT_DRYBULB_TEMP: &str = "report_drybulb_temp";
const ADD_OUTPUT_JSON: &str = "add_output_json";

/// Key value the engine uses for site-level variables.
const ENVIRONMENT_KEY: &str = "Environment";

fn report_drybulb_arg() -> ArgumentSpec {
    ArgumentSpec::boolean(REPORT_DRYBULB_TEMP, true)
        .with_display_name("Add output variables for Drybulb Temperature")
        .with_description("Will add drybulb temp and report min/max values in html.")
        .with_default(true)
}

fn drybulb_outputs() -> Vec<OutputSpec> {
    vec![
        OutputSpec::new("drybulb_min", OutputKind::Double)
            .with_display_name("Minimum outdoor drybulb")
            .with_units("C"),
        OutputSpec::new("drybulb_max", OutputKind::Double)
            .with_display_name("Maximum outdoor drybulb")
            .with_units("C"),
    ]
}

fn drybulb_requests(values: &ArgumentValues) -> Vec<EngineOutputRequest> {
    if values.get_bool(REPORT_DRYBULB_TEMP) == Some(true) {
        vec![EngineOutputRequest::variable(
            None,
            DRYBULB_VARIABLE,
            ReportingFrequency::Hourly,
        )]
    } else {
        Vec::new()
    }
}

/// Shared `run` body: read drybulb stats (when asked), then write the report.
async fn run_drybulb_report(title: &str, ctx: &mut RunContext<'_>) -> Result<(), ModuleError> {
    let wanted = ctx.values().get_bool(REPORT_DRYBULB_TEMP).unwrap_or(false);

    let results = ctx.open_results()?;
    let series = if wanted {
        results.time_series(DRYBULB_VARIABLE, ENVIRONMENT_KEY, ReportingFrequency::Hourly)?
    } else {
        None
    };
    results.release();

    let mut rows = String::new();
    match series.as_ref().and_then(|s| Some((s.min()?, s.max()?))) {
        Some((min, max)) => {
            ctx.log().register_value("drybulb_min", min);
            ctx.log().register_value("drybulb_max", max);
            rows.push_str(&format!(
                "<tr><td>Minimum</td><td>{min:.2} C</td></tr>\n<tr><td>Maximum</td><td>{max:.2} C</td></tr>\n"
            ));
        }
        None if wanted => {
            ctx.log()
                .register_warning(format!("no hourly data for '{DRYBULB_VARIABLE}'"));
            rows.push_str("<tr><td colspan=\"2\">No drybulb data</td></tr>\n");
        }
        None => {
            debug!("drybulb reporting disabled");
        }
    }

    let html = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n<table>\n{rows}</table>\n</body>\n</html>\n"
    );
    ctx.write_report("report.html", html).await?;
    ctx.log().register_final_condition("report written");
    Ok(())
}

/// Reporting measure with both hooks.
pub struct ReportingWithModelOutputRequests;

impl ReportingWithModelOutputRequests {
    pub const ID: &'static str = "reporting_with_requests";
}

#[async_trait]
impl Module for ReportingWithModelOutputRequests {
    fn name(&self) -> &str {
        "Reporting Measure with Model Output Requests"
    }

    fn description(&self) -> &str {
        "A reporting measure that requests structured output before translation"
    }

    fn modeler_description(&self) -> &str {
        "Sets Output:JSON before translation and asks for hourly outdoor drybulb after it"
    }

    fn arguments(&self, _context: &ArgumentContext<'_>) -> Vec<ArgumentSpec> {
        vec![
            report_drybulb_arg(),
            ArgumentSpec::boolean(ADD_OUTPUT_JSON, true)
                .with_display_name("Request JSON output")
                .with_description(
                    "Will add Output:JSON with TimeSeriesAndTabular and set Output JSON to true",
                )
                .with_default(true),
        ]
    }

    fn outputs(&self) -> Vec<OutputSpec> {
        drybulb_outputs()
    }

    fn pre_translation(&self) -> Option<&dyn PreTranslationHook> {
        Some(self)
    }

    fn output_requests(&self) -> Option<&dyn OutputRequestHook> {
        Some(self)
    }

    async fn run(&self, ctx: &mut RunContext<'_>) -> Result<(), ModuleError> {
        run_drybulb_report(self.name(), ctx).await
    }
}

impl PreTranslationHook for ReportingWithModelOutputRequests {
    fn on_pre_translation(
        &self,
        reporting: &mut dyn ReportingConfig,
        values: &ArgumentValues,
    ) -> Result<(), ModuleError> {
        if values.get_bool(ADD_OUTPUT_JSON) == Some(true) {
            reporting.set_output_json(OutputJson::default());
        }
        Ok(())
    }
}

impl OutputRequestHook for ReportingWithModelOutputRequests {
    fn on_output_request(
        &self,
        ctx: &OutputRequestContext<'_>,
    ) -> Result<Vec<EngineOutputRequest>, ModuleError> {
        let values = ctx.resolve(&self.arguments(&ctx.argument_context()))?;
        Ok(drybulb_requests(&values))
    }
}

/// Older reporting measure: output requests only.
pub struct ReportingWithoutModelOutputRequests;

impl ReportingWithoutModelOutputRequests {
    pub const ID: &'static str = "reporting_without_requests";
}

#[async_trait]
impl Module for ReportingWithoutModelOutputRequests {
    fn name(&self) -> &str {
        "Reporting Measure without Model Output Requests"
    }

    fn description(&self) -> &str {
        "An older reporting measure without a pre-translation hook"
    }

    fn modeler_description(&self) -> &str {
        "Asks for hourly outdoor drybulb after translation"
    }

    fn arguments(&self, _context: &ArgumentContext<'_>) -> Vec<ArgumentSpec> {
        vec![report_drybulb_arg()]
    }

    fn outputs(&self) -> Vec<OutputSpec> {
        drybulb_outputs()
    }

    fn output_requests(&self) -> Option<&dyn OutputRequestHook> {
        Some(self)
    }

    async fn run(&self, ctx: &mut RunContext<'_>) -> Result<(), ModuleError> {
        run_drybulb_report(self.name(), ctx).await
    }
}

impl OutputRequestHook for ReportingWithoutModelOutputRequests {
    fn on_output_request(
        &self,
        ctx: &OutputRequestContext<'_>,
    ) -> Result<Vec<EngineOutputRequest>, ModuleError> {
        let values = ctx.resolve(&self.arguments(&ctx.argument_context()))?;
        Ok(drybulb_requests(&values))
    }
}
