//! Per-invocation log of messages and registered values.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::output::{sanitize_key, OutputValue};

/// Severity or role of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    InitialCondition,
    FinalCondition,
}

/// One ordered log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: LogLevel,
    pub text: String,
}

/// Collects what a module reports while it runs.
///
/// Messages are mirrored to `tracing` as they are registered.
#[derive(Debug, Default)]
pub struct RunLog {
    module: String,
    messages: Vec<LogMessage>,
    values: Vec<(String, OutputValue)>,
    not_applicable: bool,
}

impl RunLog {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    fn push(&mut self, level: LogLevel, text: String) {
        self.messages.push(LogMessage { level, text });
    }

    pub fn register_info(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!(module = %self.module, "{}", text);
        self.push(LogLevel::Info, text);
    }

    pub fn register_warning(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!(module = %self.module, "{}", text);
        self.push(LogLevel::Warning, text);
    }

    pub fn register_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        error!(module = %self.module, "{}", text);
        self.push(LogLevel::Error, text);
    }

    pub fn register_initial_condition(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!(module = %self.module, initial_condition = %text);
        self.push(LogLevel::InitialCondition, text);
    }

    pub fn register_final_condition(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!(module = %self.module, final_condition = %text);
        self.push(LogLevel::FinalCondition, text);
    }

    /// Mark the invocation as not applicable to this model.
    pub fn register_as_not_applicable(&mut self, text: impl Into<String>) {
        self.not_applicable = true;
        self.register_info(text);
    }

    /// Register a named output value. The name is sanitised; a later value
    /// under the same name replaces the earlier one.
    pub fn register_value(&mut self, name: &str, value: impl Into<OutputValue>) {
        let key = sanitize_key(name);
        let value = value.into();
        if let Some(slot) = self.values.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.values.push((key, value));
        }
    }

    pub fn messages(&self) -> &[LogMessage] {
        &self.messages
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.level == LogLevel::Error)
    }

    pub fn is_not_applicable(&self) -> bool {
        self.not_applicable
    }

    pub(crate) fn into_parts(self) -> (Vec<LogMessage>, Vec<(String, OutputValue)>, bool) {
        (self.messages, self.values, self.not_applicable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_keep_order() {
        let mut log = RunLog::new("m");
        log.register_initial_condition("start");
        log.register_warning("careful");
        log.register_final_condition("done");
        let levels: Vec<LogLevel> = log.messages().iter().map(|m| m.level).collect();
        assert_eq!(
            levels,
            vec![LogLevel::InitialCondition, LogLevel::Warning, LogLevel::FinalCondition]
        );
        assert!(!log.has_errors());
    }

    #[test]
    fn test_register_value_sanitizes_and_replaces() {
        let mut log = RunLog::new("m");
        log.register_value("peak.temp", 1.0);
        log.register_value("peak|temp", 2.0);
        let (_, values, _) = log.into_parts();
        assert_eq!(values, vec![("peak_temp".to_string(), OutputValue::Double(2.0))]);
    }

    #[test]
    fn test_not_applicable_flag() {
        let mut log = RunLog::new("m");
        log.register_as_not_applicable("no zones");
        assert!(log.is_not_applicable());
        assert_eq!(log.messages()[0].level, LogLevel::Info);
    }
}
