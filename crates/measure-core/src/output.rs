//! Declared outputs and registered output values.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Type of a declared output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Boolean,
    Integer,
    Double,
    String,
}

/// A machine-readable output a module promises it may register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,
    pub display_name: String,
    pub kind: OutputKind,
    pub units: Option<String>,
}

impl OutputSpec {
    pub fn new(name: impl Into<String>, kind: OutputKind) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            kind,
            units: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Whether `value` can be reported under this output.
    pub fn accepts(&self, value: &OutputValue) -> bool {
        matches!(
            (self.kind, value),
            (OutputKind::Boolean, OutputValue::Bool(_))
                | (OutputKind::Integer, OutputValue::Integer(_))
                | (OutputKind::Double, OutputValue::Double(_))
                | (OutputKind::Double, OutputValue::Integer(_))
                | (OutputKind::String, OutputValue::String(_))
        )
    }
}

/// A value registered by a module during `run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl From<bool> for OutputValue {
    fn from(v: bool) -> Self {
        OutputValue::Bool(v)
    }
}

impl From<i64> for OutputValue {
    fn from(v: i64) -> Self {
        OutputValue::Integer(v)
    }
}

impl From<usize> for OutputValue {
    fn from(v: usize) -> Self {
        OutputValue::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for OutputValue {
    fn from(v: f64) -> Self {
        OutputValue::Double(v)
    }
}

impl From<&str> for OutputValue {
    fn from(v: &str) -> Self {
        OutputValue::String(v.to_string())
    }
}

impl From<String> for OutputValue {
    fn from(v: String) -> Self {
        OutputValue::String(v)
    }
}

fn invalid_key_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("static regex"))
}

fn underscore_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_{2,}").expect("static regex"))
}

/// Normalise an output key so downstream stores accept it.
///
/// Periods, pipes and other punctuation become `_`, runs of `_` collapse to
/// one, and trailing `_` and spaces are dropped.
pub fn sanitize_key(key: &str) -> String {
    let replaced = invalid_key_chars().replace_all(key, "_");
    let squeezed = underscore_runs().replace_all(&replaced, "_");
    squeezed.trim_end_matches(['_', ' ']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_key_table() {
        let cases = [
            ("Regular", "Regular"),
            ("key1!@#", "key1"),
            ("key2.{}\\", "key2"),
            ("key3_ ", "key3"),
            ("invalid|key", "invalid_key"),
            ("another key", "another key"),
            ("special@char", "special_char"),
            ("key.with.dots", "key_with_dots"),
            ("slashes\\/included", "slashes_included"),
            ("!exclamation", "_exclamation"),
            ("(open_parenthesis)", "_open_parenthesis"),
            ("}close_brace{", "_close_brace"),
            ("\"double_quote\"", "_double_quote"),
            ("___", ""),
            ("key_with___underscores", "key_with_underscores"),
            ("__underscored__key__", "_underscored_key"),
            ("___double___underscores___", "_double_underscores"),
        ];
        for (input, expected) in cases {
            assert_eq!(sanitize_key(input), expected, "sanitizing {input:?}");
        }
    }

    #[test]
    fn test_output_spec_accepts() {
        let spec = OutputSpec::new("peak", OutputKind::Double).with_units("C");
        assert!(spec.accepts(&OutputValue::Double(1.0)));
        assert!(spec.accepts(&OutputValue::Integer(1)));
        assert!(!spec.accepts(&OutputValue::String("1".to_string())));
        assert_eq!(spec.display_name, "peak");
    }
}
