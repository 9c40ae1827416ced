//! Argument schema and typed argument values.
//!
//! A module declares an ordered list of [`ArgumentSpec`]s. The orchestrator
//! supplies loosely-typed [`RawArguments`] which are checked once by
//! [`validate`](crate::validate::validate) and turned into [`ArgumentValues`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Loosely-typed argument map as it arrives from a workflow file or CLI.
pub type RawArguments = BTreeMap<String, Value>;

/// Declared type of an argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArgumentKind {
    Boolean,
    Integer,
    Double,
    String,
    Choice {
        choices: Vec<String>,
        /// Parallel to `choices`; empty when no display names were given.
        display_names: Vec<String>,
    },
    Path,
}

impl ArgumentKind {
    /// Name used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgumentKind::Boolean => "boolean",
            ArgumentKind::Integer => "integer",
            ArgumentKind::Double => "double",
            ArgumentKind::String => "string",
            ArgumentKind::Choice { .. } => "choice",
            ArgumentKind::Path => "path",
        }
    }
}

/// A concrete, type-checked argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArgumentValue {
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Choice(String),
    Path(PathBuf),
}

impl ArgumentValue {
    /// Render the value back into its raw JSON form.
    pub fn to_json(&self) -> Value {
        match self {
            ArgumentValue::Bool(b) => Value::Bool(*b),
            ArgumentValue::Integer(i) => Value::from(*i),
            ArgumentValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ArgumentValue::String(s) | ArgumentValue::Choice(s) => Value::String(s.clone()),
            ArgumentValue::Path(p) => Value::String(p.to_string_lossy().into_owned()),
        }
    }
}

impl From<bool> for ArgumentValue {
    fn from(v: bool) -> Self {
        ArgumentValue::Bool(v)
    }
}

impl From<i64> for ArgumentValue {
    fn from(v: i64) -> Self {
        ArgumentValue::Integer(v)
    }
}

impl From<f64> for ArgumentValue {
    fn from(v: f64) -> Self {
        ArgumentValue::Double(v)
    }
}

impl From<&str> for ArgumentValue {
    fn from(v: &str) -> Self {
        ArgumentValue::String(v.to_string())
    }
}

impl From<String> for ArgumentValue {
    fn from(v: String) -> Self {
        ArgumentValue::String(v)
    }
}

/// Declaration of a single user-facing argument.
///
/// Built once through the constructor/`with_*` chain and read-only afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    name: String,
    kind: ArgumentKind,
    required: bool,
    default_value: Option<ArgumentValue>,
    display_name: Option<String>,
    description: Option<String>,
    units: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
}

impl ArgumentSpec {
    fn new(name: impl Into<String>, kind: ArgumentKind, required: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            required,
            default_value: None,
            display_name: None,
            description: None,
            units: None,
            min: None,
            max: None,
        }
    }

    pub fn boolean(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ArgumentKind::Boolean, required)
    }

    pub fn integer(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ArgumentKind::Integer, required)
    }

    pub fn double(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ArgumentKind::Double, required)
    }

    pub fn string(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ArgumentKind::String, required)
    }

    pub fn path(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ArgumentKind::Path, required)
    }

    /// Enumerated argument; `choices` are the accepted values.
    pub fn choice<I, S>(name: impl Into<String>, choices: I, required: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices = choices.into_iter().map(Into::into).collect();
        Self::new(
            name,
            ArgumentKind::Choice {
                choices,
                display_names: Vec::new(),
            },
            required,
        )
    }

    /// Attach display names to a choice argument. Ignored for other kinds
    /// or when the lengths do not line up.
    pub fn with_choice_display_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let ArgumentKind::Choice {
            choices,
            display_names,
        } = &mut self.kind
        {
            let names: Vec<String> = names.into_iter().map(Into::into).collect();
            if names.len() == choices.len() {
                *display_names = names;
            }
        }
        self
    }

    pub fn with_default(mut self, value: impl Into<ArgumentValue>) -> Self {
        let value = value.into();
        // Choice defaults are stored as choices, not free strings.
        let value = match (&self.kind, value) {
            (ArgumentKind::Choice { .. }, ArgumentValue::String(s)) => ArgumentValue::Choice(s),
            (ArgumentKind::Path, ArgumentValue::String(s)) => ArgumentValue::Path(s.into()),
            (ArgumentKind::Double, ArgumentValue::Integer(i)) => ArgumentValue::Double(i as f64),
            (_, v) => v,
        };
        self.default_value = Some(value);
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Inclusive lower bound for numeric arguments.
    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Inclusive upper bound for numeric arguments.
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ArgumentKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&ArgumentValue> {
        self.default_value.as_ref()
    }

    /// Display name, falling back to the argument name.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }
}

/// Validated argument values for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentValues {
    values: BTreeMap<String, ArgumentValue>,
}

impl ArgumentValues {
    pub(crate) fn from_map(values: BTreeMap<String, ArgumentValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&ArgumentValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ArgumentValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgumentValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers are widened.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ArgumentValue::Double(d)) => Some(*d),
            Some(ArgumentValue::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }

    /// String or choice value.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgumentValue::String(s)) | Some(ArgumentValue::Choice(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_path(&self, name: &str) -> Option<&Path> {
        match self.values.get(name) {
            Some(ArgumentValue::Path(p)) => Some(p),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgumentValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// SHA-256 hex digest of the canonical (key-sorted) JSON form.
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_vec(&self.to_raw()).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }

    /// Render back into a raw map, e.g. to re-validate downstream.
    pub fn to_raw(&self) -> RawArguments {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_builder_fields() {
        let spec = ArgumentSpec::double("setpoint", true)
            .with_display_name("Setpoint")
            .with_description("Cooling setpoint")
            .with_units("C")
            .with_min(10.0)
            .with_max(35.0)
            .with_default(24_i64);

        assert_eq!(spec.name(), "setpoint");
        assert_eq!(spec.display_name(), "Setpoint");
        assert_eq!(spec.units(), Some("C"));
        assert_eq!(spec.min(), Some(10.0));
        assert_eq!(spec.default_value(), Some(&ArgumentValue::Double(24.0)));
    }

    #[test]
    fn test_display_name_falls_back_to_name() {
        let spec = ArgumentSpec::boolean("flag", false);
        assert_eq!(spec.display_name(), "flag");
    }

    #[test]
    fn test_choice_default_is_stored_as_choice() {
        let spec = ArgumentSpec::choice("frequency", ["Hourly", "Daily"], true).with_default("Daily");
        assert_eq!(
            spec.default_value(),
            Some(&ArgumentValue::Choice("Daily".to_string()))
        );
    }

    #[test]
    fn test_choice_display_names_must_line_up() {
        let spec = ArgumentSpec::choice("zone", ["a", "b"], true).with_choice_display_names(["A"]);
        match spec.kind() {
            ArgumentKind::Choice { display_names, .. } => assert!(display_names.is_empty()),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_values_accessors_and_to_raw() {
        let mut map = BTreeMap::new();
        map.insert("flag".to_string(), ArgumentValue::Bool(true));
        map.insert("count".to_string(), ArgumentValue::Integer(3));
        map.insert("zone".to_string(), ArgumentValue::Choice("Core".to_string()));
        let values = ArgumentValues::from_map(map);

        assert_eq!(values.get_bool("flag"), Some(true));
        assert_eq!(values.get_f64("count"), Some(3.0));
        assert_eq!(values.get_str("zone"), Some("Core"));
        assert_eq!(values.get_bool("missing"), None);

        assert_eq!(values.digest(), values.clone().digest());
        assert_eq!(values.digest().len(), 64);

        let raw = values.to_raw();
        assert_eq!(raw["flag"], json!(true));
        assert_eq!(raw["count"], json!(3));
        assert_eq!(raw["zone"], json!("Core"));
    }
}
