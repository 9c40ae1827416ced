//! JSON-backed results store.
//!
//! Stands in for the engine's results database. The file is read on
//! `acquire` and dropped on `release`; queries outside that window fail.
//!
//! `acquire` is synchronous and reads the whole file. On a multi-threaded
//! tokio runtime the read goes through `block_in_place` so other tasks keep
//! their worker; elsewhere it blocks the caller.
//!
//! ```json
//! { "series": [ { "variable": "...", "key_value": "Environment",
//!                 "frequency": "Hourly", "units": "C", "values": [1.0] } ] }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::runtime::{Handle, RuntimeFlavor};

use measure_core::{ReportingFrequency, ResultsError, ResultsStore, TimeSeries};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsFile {
    #[serde(default)]
    pub series: Vec<TimeSeries>,
}

#[derive(Debug)]
pub struct JsonResultsStore {
    path: PathBuf,
    loaded: Mutex<Option<Vec<TimeSeries>>>,
}

impl JsonResultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<ResultsFile, ResultsError> {
        let unavailable = |e: &dyn std::fmt::Display| {
            ResultsError::Unavailable(format!("{}: {e}", self.path.display()))
        };
        let text = std::fs::read_to_string(&self.path).map_err(|e| unavailable(&e))?;
        serde_json::from_str(&text).map_err(|e| unavailable(&e))
    }

    fn with_series<T>(&self, f: impl FnOnce(&[TimeSeries]) -> T) -> Result<T, ResultsError> {
        let guard = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_deref().map(f).ok_or(ResultsError::NotOpen)
    }
}

impl ResultsStore for JsonResultsStore {
    fn acquire(&self) -> Result<(), ResultsError> {
        let file = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| self.read_file())?
            }
            _ => self.read_file()?,
        };
        tracing::debug!(path = %self.path.display(), series = file.series.len(), "results opened");
        *self.loaded.lock().unwrap_or_else(|e| e.into_inner()) = Some(file.series);
        Ok(())
    }

    fn release(&self) {
        self.loaded.lock().unwrap_or_else(|e| e.into_inner()).take();
        tracing::debug!(path = %self.path.display(), "results closed");
    }

    fn key_values(&self, variable: &str) -> Result<Vec<String>, ResultsError> {
        self.with_series(|series| {
            let mut keys: Vec<String> = Vec::new();
            for s in series.iter().filter(|s| s.variable.eq_ignore_ascii_case(variable)) {
                if !keys.iter().any(|k| k.eq_ignore_ascii_case(&s.key_value)) {
                    keys.push(s.key_value.clone());
                }
            }
            keys
        })
    }

    fn time_series(
        &self,
        variable: &str,
        key_value: &str,
        frequency: ReportingFrequency,
    ) -> Result<Option<TimeSeries>, ResultsError> {
        self.with_series(|series| {
            series
                .iter()
                .find(|s| {
                    s.variable.eq_ignore_ascii_case(variable)
                        && s.key_value.eq_ignore_ascii_case(key_value)
                        && s.frequency == frequency
                })
                .cloned()
        })
    }
}
