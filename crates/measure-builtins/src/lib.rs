//! Measurekit builtins
//!
//! Concrete modules shipped with the CLI:
//! - reporting measures with and without a pre-translation hook
//! - a zero-argument minimal measure
//! - a zone temperature report whose choices come from the model
//! - a Modelica zone parameter measure

pub mod minimal;
pub mod modelica;
pub mod reporting;
pub mod zone_temperature;

use std::sync::Arc;

use measure_core::{ModuleRegistry, RegistryError};

pub use minimal::MinimalReporting;
pub use modelica::SetModelicaZones;
pub use reporting::{ReportingWithModelOutputRequests, ReportingWithoutModelOutputRequests};
pub use zone_temperature::ZoneTemperatureReport;

/// Variable requested by the drybulb reporting measures.
pub const DRYBULB_VARIABLE: &str = "Site Outdoor Air Drybulb Temperature";

/// Register every builtin under its id.
pub fn register_all(registry: &mut ModuleRegistry) -> Result<(), RegistryError> {
    registry.register(
        ReportingWithModelOutputRequests::ID,
        Arc::new(ReportingWithModelOutputRequests),
    )?;
    registry.register(
        ReportingWithoutModelOutputRequests::ID,
        Arc::new(ReportingWithoutModelOutputRequests),
    )?;
    registry.register(MinimalReporting::ID, Arc::new(MinimalReporting))?;
    registry.register(ZoneTemperatureReport::ID, Arc::new(ZoneTemperatureReport))?;
    registry.register(SetModelicaZones::ID, Arc::new(SetModelicaZones))?;
    Ok(())
}

/// A fresh registry holding all builtins.
pub fn default_registry() -> Result<ModuleRegistry, RegistryError> {
    let mut registry = ModuleRegistry::new();
    register_all(&mut registry)?;
    Ok(registry)
}
