//! Modelica zone parameters.
//!
//! Sets `zoneNames` to the quoted names of every zone that has people, in
//! Modelica array syntax (`{"A", "B"}`), and `zoneCount` to their number.

use async_trait::async_trait;

use measure_core::{
    ArgumentContext, ArgumentSpec, Module, ModuleError, OutputKind, OutputSpec, RunContext,
    ZoneSummary,
};

pub const ZONE_NAMES_PARAMETER: &str = "zoneNames";
pub const ZONE_COUNT_PARAMETER: &str = "zoneCount";

pub struct SetModelicaZones;

impl SetModelicaZones {
    pub const ID: &'static str = "set_modelica_zones";
}

/// Modelica array literal of the zones that have people.
pub fn zone_names_parameter(zones: &[ZoneSummary]) -> (String, usize) {
    let occupied: Vec<String> = zones
        .iter()
        .filter(|z| z.people > 0.0)
        .map(|z| format!("\"{}\"", z.name))
        .collect();
    (format!("{{{}}}", occupied.join(", ")), occupied.len())
}

#[async_trait]
impl Module for SetModelicaZones {
    fn name(&self) -> &str {
        "SetModelicaZones"
    }

    fn description(&self) -> &str {
        "Pass the occupied thermal zones to the Modelica seed model"
    }

    fn modeler_description(&self) -> &str {
        "Only zones with people are included"
    }

    fn arguments(&self, _context: &ArgumentContext<'_>) -> Vec<ArgumentSpec> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<OutputSpec> {
        vec![OutputSpec::new("zone_count", OutputKind::Integer)]
    }

    async fn run(&self, ctx: &mut RunContext<'_>) -> Result<(), ModuleError> {
        let zones = ctx.model().thermal_zones();
        ctx.log()
            .register_initial_condition(format!("model has {} thermal zones", zones.len()));

        let (names, count) = zone_names_parameter(&zones);
        let model = ctx.model_mut();
        model.set_parameter(ZONE_NAMES_PARAMETER, &names)?;
        model.set_parameter(ZONE_COUNT_PARAMETER, &count.to_string())?;

        ctx.log().register_value("zone_count", count as i64);
        ctx.log()
            .register_final_condition(format!("{count} occupied zones passed to Modelica"));
        Ok(())
    }
}
