//! Narrow capability interfaces over the host's model and results.
//!
//! Modules never see the host's full object model. They get a
//! [`ModelHandle`] (and, in pre-translation, only its [`ReportingConfig`])
//! plus a [`ResultsStore`] that must be opened through a scoped
//! [`ResultsHandle`].

use serde::{Deserialize, Serialize};

use crate::error::{ModuleError, ResultsError};
use crate::request::ReportingFrequency;

/// Option type of the engine's structured JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputJsonOption {
    TimeSeries,
    TimeSeriesAndTabular,
}

/// Structured-output configuration on the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputJson {
    pub option_type: OutputJsonOption,
    pub output_json: bool,
    pub output_cbor: bool,
    pub output_message_pack: bool,
}

impl Default for OutputJson {
    fn default() -> Self {
        Self {
            option_type: OutputJsonOption::TimeSeriesAndTabular,
            output_json: true,
            output_cbor: false,
            output_message_pack: false,
        }
    }
}

/// Reporting-oriented configuration on a model.
///
/// This is the only part of the model a pre-translation hook receives.
pub trait ReportingConfig: Send + Sync {
    fn output_json(&self) -> Option<OutputJson>;

    fn set_output_json(&mut self, config: OutputJson);

    /// Tabular summary reports, in request order.
    fn summary_reports(&self) -> Vec<String>;

    /// Add a summary report; returns false if it was already present.
    fn add_summary_report(&mut self, report: &str) -> bool;
}

/// Thermal zone as seen by modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub name: String,
    #[serde(default)]
    pub floor_area_m2: f64,
    #[serde(default)]
    pub people: f64,
}

/// Mutable handle to the orchestrator-owned building model.
pub trait ModelHandle: Send + Sync {
    fn building_name(&self) -> Option<String> {
        None
    }

    fn thermal_zones(&self) -> Vec<ZoneSummary>;

    fn reporting(&self) -> &dyn ReportingConfig;

    fn reporting_mut(&mut self) -> &mut dyn ReportingConfig;

    fn parameter(&self, name: &str) -> Option<String>;

    /// Set a named model parameter (e.g. a Modelica parameter value).
    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), ModuleError>;
}

/// One reported time series from a completed simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub variable: String,
    pub key_value: String,
    pub frequency: ReportingFrequency,
    #[serde(default)]
    pub units: String,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
        }
    }
}

/// Queryable store of completed simulation results.
///
/// `acquire`/`release` bracket every use; queries are only valid in between.
/// Modules go through [`ResultsHandle`], which pairs them.
pub trait ResultsStore: Send + Sync {
    fn acquire(&self) -> Result<(), ResultsError>;

    fn release(&self);

    /// Key values reported for a variable (empty if none).
    fn key_values(&self, variable: &str) -> Result<Vec<String>, ResultsError>;

    fn time_series(
        &self,
        variable: &str,
        key_value: &str,
        frequency: ReportingFrequency,
    ) -> Result<Option<TimeSeries>, ResultsError>;
}

/// Scoped acquisition of a [`ResultsStore`].
///
/// Released exactly once: either through [`ResultsHandle::release`] or when
/// dropped, whichever comes first.
pub struct ResultsHandle<'a> {
    store: &'a dyn ResultsStore,
    released: bool,
}

impl<'a> ResultsHandle<'a> {
    pub fn acquire(store: &'a dyn ResultsStore) -> Result<Self, ResultsError> {
        store.acquire()?;
        tracing::debug!("results store acquired");
        Ok(Self {
            store,
            released: false,
        })
    }

    pub fn key_values(&self, variable: &str) -> Result<Vec<String>, ResultsError> {
        self.store.key_values(variable)
    }

    pub fn time_series(
        &self,
        variable: &str,
        key_value: &str,
        frequency: ReportingFrequency,
    ) -> Result<Option<TimeSeries>, ResultsError> {
        self.store.time_series(variable, key_value, frequency)
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.store.release();
            tracing::debug!("results store released");
        }
    }
}

impl Drop for ResultsHandle<'_> {
    fn drop(&mut self) {
        self.release_inner();
    }
}
