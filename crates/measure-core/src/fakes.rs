//! In-memory fakes for the capability traits (testing only)
//!
//! Provides `FakeModel` and `FakeResultsStore` that satisfy the trait
//! contracts without a host engine. `FakeResultsStore` counts acquire and
//! release calls so tests can check scoped acquisition on every exit path.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::capability::{
    ModelHandle, OutputJson, ReportingConfig, ResultsStore, TimeSeries, ZoneSummary,
};
use crate::error::{ModuleError, ResultsError};
use crate::request::ReportingFrequency;

// ---------------------------------------------------------------------------
// FakeModel
// ---------------------------------------------------------------------------

/// Reporting settings held by [`FakeModel`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeReporting {
    pub output_json: Option<OutputJson>,
    pub summary_reports: Vec<String>,
}

impl ReportingConfig for FakeReporting {
    fn output_json(&self) -> Option<OutputJson> {
        self.output_json.clone()
    }

    fn set_output_json(&mut self, config: OutputJson) {
        self.output_json = Some(config);
    }

    fn summary_reports(&self) -> Vec<String> {
        self.summary_reports.clone()
    }

    fn add_summary_report(&mut self, report: &str) -> bool {
        if self.summary_reports.iter().any(|r| r == report) {
            return false;
        }
        self.summary_reports.push(report.to_string());
        true
    }
}

/// In-memory model with zones, reporting settings and parameters.
#[derive(Debug, Clone, Default)]
pub struct FakeModel {
    pub name: Option<String>,
    pub zones: Vec<ZoneSummary>,
    pub reporting: FakeReporting,
    pub parameters: BTreeMap<String, String>,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, name: &str, floor_area_m2: f64, people: f64) -> Self {
        self.zones.push(ZoneSummary {
            name: name.to_string(),
            floor_area_m2,
            people,
        });
        self
    }
}

impl ModelHandle for FakeModel {
    fn building_name(&self) -> Option<String> {
        self.name.clone()
    }

    fn thermal_zones(&self) -> Vec<ZoneSummary> {
        self.zones.clone()
    }

    fn reporting(&self) -> &dyn ReportingConfig {
        &self.reporting
    }

    fn reporting_mut(&mut self) -> &mut dyn ReportingConfig {
        &mut self.reporting
    }

    fn parameter(&self, name: &str) -> Option<String> {
        self.parameters.get(name).cloned()
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), ModuleError> {
        self.parameters.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeResultsStore
// ---------------------------------------------------------------------------

/// In-memory results store that records acquire/release counts.
#[derive(Debug, Default)]
pub struct FakeResultsStore {
    series: Mutex<Vec<TimeSeries>>,
    open: AtomicBool,
    acquires: AtomicUsize,
    releases: AtomicUsize,
    fail_acquire: bool,
    fail_queries: bool,
}

impl FakeResultsStore {
    /// A store with no data.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: TimeSeries) -> Self {
        self.series
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .push(series);
        self
    }

    /// Convenience for an hourly series.
    pub fn with_hourly(self, variable: &str, key_value: &str, values: Vec<f64>) -> Self {
        self.with_series(TimeSeries {
            variable: variable.to_string(),
            key_value: key_value.to_string(),
            frequency: ReportingFrequency::Hourly,
            units: "C".to_string(),
            values,
        })
    }

    /// Make `acquire` fail.
    pub fn failing_acquire(mut self) -> Self {
        self.fail_acquire = true;
        self
    }

    /// Make every query fail after a successful acquire.
    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn acquire_count(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn check_query(&self) -> Result<(), ResultsError> {
        if !self.is_open() {
            return Err(ResultsError::NotOpen);
        }
        if self.fail_queries {
            return Err(ResultsError::Query("injected query failure".to_string()));
        }
        Ok(())
    }
}

impl ResultsStore for FakeResultsStore {
    fn acquire(&self) -> Result<(), ResultsError> {
        if self.fail_acquire {
            return Err(ResultsError::Unavailable("injected acquire failure".to_string()));
        }
        self.acquires.fetch_add(1, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
    }

    fn key_values(&self, variable: &str) -> Result<Vec<String>, ResultsError> {
        self.check_query()?;
        let series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = series
            .iter()
            .filter(|s| s.variable == variable)
            .map(|s| s.key_value.clone())
            .collect();
        keys.dedup();
        Ok(keys)
    }

    fn time_series(
        &self,
        variable: &str,
        key_value: &str,
        frequency: ReportingFrequency,
    ) -> Result<Option<TimeSeries>, ResultsError> {
        self.check_query()?;
        let series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        Ok(series
            .iter()
            .find(|s| {
                s.variable == variable
                    && s.key_value.eq_ignore_ascii_case(key_value)
                    && s.frequency == frequency
            })
            .cloned())
    }
}
