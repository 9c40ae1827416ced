//! Zone mean air temperature report.
//!
//! The `zone` argument's choices come from the model's thermal zones plus
//! `*` (all zones). Without a model only `*` is offered.

use async_trait::async_trait;

use measure_core::{
    ArgumentContext, ArgumentSpec, ArgumentValues, EngineOutputRequest, Module, ModuleError,
    OutputKind, OutputRequestContext, OutputRequestHook, OutputSpec, ReportingFrequency,
    RunContext, TimeSeries,
};

pub const ZONE_TEMPERATURE_VARIABLE: &str = "Zone Mean Air Temperature";

const ZONE: &str = "zone";
const FREQUENCY: &str = "frequency";
const ALL_ZONES: &str = "*";

pub struct ZoneTemperatureReport;

impl ZoneTemperatureReport {
    pub const ID: &'static str = "zone_temperature_report";
}

fn selected_frequency(values: &ArgumentValues) -> Result<ReportingFrequency, ModuleError> {
    values
        .get_str(FREQUENCY)
        .unwrap_or("Hourly")
        .parse()
        .map_err(ModuleError::Execution)
}

#[async_trait]
impl Module for ZoneTemperatureReport {
    fn name(&self) -> &str {
        "Zone Temperature Report"
    }

    fn description(&self) -> &str {
        "Summarise zone mean air temperatures per thermal zone"
    }

    fn modeler_description(&self) -> &str {
        "Requests Zone Mean Air Temperature for one zone or all zones and writes min/max/mean to CSV"
    }

    fn arguments(&self, context: &ArgumentContext<'_>) -> Vec<ArgumentSpec> {
        let zones: Vec<String> = context
            .model()
            .map(|m| m.thermal_zones().into_iter().map(|z| z.name).collect())
            .unwrap_or_default();

        let mut choices = vec![ALL_ZONES.to_string()];
        let mut display = vec!["All Zones".to_string()];
        for name in zones {
            display.push(name.clone());
            choices.push(name);
        }

        vec![
            ArgumentSpec::choice(ZONE, choices, true)
                .with_choice_display_names(display)
                .with_display_name("Thermal zone")
                .with_default(ALL_ZONES),
            ArgumentSpec::choice(
                FREQUENCY,
                ReportingFrequency::ALL.iter().map(|f| f.as_str()),
                true,
            )
            .with_display_name("Reporting frequency")
            .with_default("Hourly"),
        ]
    }

    fn outputs(&self) -> Vec<OutputSpec> {
        vec![
            OutputSpec::new("zones_reported", OutputKind::Integer),
            OutputSpec::new("peak_zone_temperature", OutputKind::Double).with_units("C"),
        ]
    }

    fn output_requests(&self) -> Option<&dyn OutputRequestHook> {
        Some(self)
    }

    async fn run(&self, ctx: &mut RunContext<'_>) -> Result<(), ModuleError> {
        if ctx.model().thermal_zones().is_empty() {
            ctx.log()
                .register_as_not_applicable("model has no thermal zones");
            return Ok(());
        }

        let values = ctx.values();
        let frequency = selected_frequency(values)?;
        let zone = values.get_str(ZONE).unwrap_or(ALL_ZONES).to_string();

        let results = ctx.open_results()?;
        let keys = if zone == ALL_ZONES {
            results.key_values(ZONE_TEMPERATURE_VARIABLE)?
        } else {
            vec![zone]
        };
        let mut found: Vec<TimeSeries> = Vec::new();
        for key in &keys {
            match results.time_series(ZONE_TEMPERATURE_VARIABLE, key, frequency)? {
                Some(series) => found.push(series),
                None => ctx
                    .log()
                    .register_warning(format!("no {frequency} data for zone '{key}'")),
            }
        }
        results.release();

        let mut csv = String::from("zone,min,max,mean\n");
        let mut peak: Option<f64> = None;
        for series in &found {
            let (Some(min), Some(max), Some(mean)) = (series.min(), series.max(), series.mean())
            else {
                continue;
            };
            csv.push_str(&format!("{},{min:.2},{max:.2},{mean:.2}\n", series.key_value));
            peak = Some(peak.map_or(max, |p| p.max(max)));
        }

        ctx.log().register_value("zones_reported", found.len());
        if let Some(peak) = peak {
            ctx.log().register_value("peak_zone_temperature", peak);
        }
        ctx.write_report("report_zone_temperatures.csv", csv).await?;
        Ok(())
    }
}

impl OutputRequestHook for ZoneTemperatureReport {
    fn on_output_request(
        &self,
        ctx: &OutputRequestContext<'_>,
    ) -> Result<Vec<EngineOutputRequest>, ModuleError> {
        let values = ctx.resolve(&self.arguments(&ctx.argument_context()))?;
        let frequency = selected_frequency(&values)?;
        let key = values.get_str(ZONE).unwrap_or(ALL_ZONES);
        Ok(vec![EngineOutputRequest::variable(
            Some(key),
            ZONE_TEMPERATURE_VARIABLE,
            frequency,
        )])
    }
}
