//! Result of one module invocation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::argument::ArgumentValues;
use crate::error::FailureKind;
use crate::output::OutputValue;
use crate::run_log::{LogLevel, LogMessage};

/// Terminal status of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Fail,
    NotApplicable,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fail => "fail",
            Self::NotApplicable => "not_applicable",
        }
    }
}

/// What a module reported back. Built once by the invocation driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    pub invocation_id: Uuid,
    pub module_name: String,
    pub status: StepStatus,
    pub failure: Option<FailureKind>,
    /// Validated arguments; absent when validation never completed.
    pub arguments: Option<ArgumentValues>,
    pub arguments_digest: Option<String>,
    pub messages: Vec<LogMessage>,
    pub values: BTreeMap<String, OutputValue>,
    /// Report artifacts written into the invocation's working directory.
    pub reports: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ModuleResult {
    /// True unless the invocation failed; not-applicable counts as success.
    pub fn success(&self) -> bool {
        self.status != StepStatus::Fail
    }

    pub fn value(&self, name: &str) -> Option<&OutputValue> {
        self.values.get(name)
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(|m| m.level == LogLevel::Error)
            .map(|m| m.text.as_str())
    }

    pub fn duration_ms(&self) -> u64 {
        (self.completed_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

/// Values registered by steps that ran earlier in the same workflow.
///
/// A step is reachable under every name it was recorded with. Names are
/// stored as given. When two steps share a name their values merge and the
/// later step wins on a clash.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PastStepValues {
    steps: BTreeMap<String, BTreeMap<String, OutputValue>>,
}

impl PastStepValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: impl Into<String>, values: &BTreeMap<String, OutputValue>) {
        let slot = self.steps.entry(name.into()).or_default();
        slot.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Record `result` under each of `names`, skipping duplicates.
    pub fn record_result<'n>(&mut self, names: impl IntoIterator<Item = &'n str>, result: &ModuleResult) {
        let mut seen: Vec<&str> = Vec::new();
        for name in names {
            if !seen.contains(&name) {
                seen.push(name);
                self.record(name, &result.values);
            }
        }
    }

    /// Everything recorded under `name`, or `None` when no step used it.
    pub fn for_step(&self, name: &str) -> Option<&BTreeMap<String, OutputValue>> {
        self.steps.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
