//! JSON-backed model adapter.
//!
//! The building model proper is owned by the host engine; this adapter only
//! carries what modules can reach through [`ModelHandle`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use measure_core::{ModelHandle, ModuleError, OutputJson, ReportingConfig, ZoneSummary};

use crate::error::{Result, RunnerError};

/// Reporting settings stored on a [`JsonModel`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonReporting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_json: Option<OutputJson>,

    #[serde(default)]
    pub summary_reports: Vec<String>,
}

impl ReportingConfig for JsonReporting {
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
        if self
            .summary_reports
            .iter()
            .any(|r| r.eq_ignore_ascii_case(report))
        {
            return false;
        }
        self.summary_reports.push(report.to_string());
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_name: Option<String>,

    #[serde(default)]
    pub thermal_zones: Vec<ZoneSummary>,

    #[serde(default)]
    pub reporting: JsonReporting,

    /// Modelica (or other) parameters set by modules.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl JsonModel {
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RunnerError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&text).map_err(|source| RunnerError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(|source| RunnerError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tokio::fs::write(path, text)
            .await
            .map_err(|source| RunnerError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl ModelHandle for JsonModel {
    fn building_name(&self) -> Option<String> {
        self.building_name.clone()
    }

    fn thermal_zones(&self) -> Vec<ZoneSummary> {
        self.thermal_zones.clone()
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

    fn set_parameter(&mut self, name: &str, value: &str) -> std::result::Result<(), ModuleError> {
        if name.trim().is_empty() {
            return Err(ModuleError::execution("parameter name must not be empty"));
        }
        self.parameters.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_keeps_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut model = JsonModel {
            building_name: Some("Office".to_string()),
            ..JsonModel::default()
        };
        model.set_parameter("zoneCount", "2").unwrap();
        model.save(&path).await.unwrap();

        let loaded = JsonModel::load(&path).await.unwrap();
        assert_eq!(loaded, model);
        assert_eq!(loaded.parameter("zoneCount").as_deref(), Some("2"));
    }

    #[test]
    fn test_sparse_model_parses() {
        let model: JsonModel =
            serde_json::from_str(r#"{ "thermal_zones": [ { "name": "Core" } ] }"#).unwrap();
        assert_eq!(model.thermal_zones()[0].people, 0.0);
        assert!(model.reporting().output_json().is_none());
    }

    #[test]
    fn test_empty_parameter_name_rejected() {
        let mut model = JsonModel::default();
        assert!(model.set_parameter(" ", "x").is_err());
    }

    #[test]
    fn test_summary_reports_case_insensitive() {
        let mut reporting = JsonReporting::default();
        assert!(reporting.add_summary_report("AllSummary"));
        assert!(!reporting.add_summary_report("allsummary"));
    }
}
