//! Argument validation.
//!
//! [`validate`] is pure: it never touches a model or results store, and the
//! same inputs always produce equal [`ArgumentValues`].

use std::collections::BTreeMap;

use serde_json::Value;

use crate::argument::{ArgumentKind, ArgumentSpec, ArgumentValue, ArgumentValues, RawArguments};
use crate::error::ValidationError;

/// Check `raw` against `specs` and return typed values.
///
/// - A required argument must be present (and not `null`) in `raw`.
/// - An optional argument that is absent takes its declared default, or is
///   left unset when it has none.
/// - Keys in `raw` that no spec declares are ignored.
///
/// Specs are checked in declaration order; the first offending argument is
/// reported.
pub fn validate(
    specs: &[ArgumentSpec],
    raw: &RawArguments,
) -> Result<ArgumentValues, ValidationError> {
    let mut values = BTreeMap::new();

    for spec in specs {
        match raw.get(spec.name()) {
            None | Some(Value::Null) => {
                if spec.is_required() {
                    return Err(ValidationError::Missing {
                        argument: spec.name().to_string(),
                    });
                }
                if let Some(default) = spec.default_value() {
                    values.insert(spec.name().to_string(), default.clone());
                }
            }
            Some(value) => {
                let coerced = coerce(spec, value)?;
                check_bounds(spec, &coerced)?;
                values.insert(spec.name().to_string(), coerced);
            }
        }
    }

    Ok(ArgumentValues::from_map(values))
}

/// Seed a raw map with every declared default, then overlay `supplied`.
///
/// This is how an orchestrator turns a declared argument vector plus the
/// user's partial settings into the map handed to [`validate`].
pub fn with_defaults(specs: &[ArgumentSpec], supplied: &RawArguments) -> RawArguments {
    let mut raw: RawArguments = specs
        .iter()
        .filter_map(|spec| {
            spec.default_value()
                .map(|d| (spec.name().to_string(), d.to_json()))
        })
        .collect();
    for (key, value) in supplied {
        raw.insert(key.clone(), value.clone());
    }
    raw
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(spec: &ArgumentSpec, value: &Value) -> ValidationError {
    ValidationError::TypeMismatch {
        argument: spec.name().to_string(),
        expected: spec.kind().type_name().to_string(),
        found: match value {
            Value::String(s) => format!("string '{s}'"),
            other => json_type_name(other).to_string(),
        },
    }
}

/// Whole floats inside the `i64` range. `i64::MAX as f64` rounds up to 2^63,
/// so the upper bound is exclusive.
fn integral_f64(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

fn coerce(spec: &ArgumentSpec, value: &Value) -> Result<ArgumentValue, ValidationError> {
    match spec.kind() {
        ArgumentKind::Boolean => match value {
            Value::Bool(b) => Ok(ArgumentValue::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(ArgumentValue::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(ArgumentValue::Bool(false)),
            other => Err(mismatch(spec, other)),
        },
        ArgumentKind::Integer => {
            let parsed = match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().and_then(integral_f64)),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            parsed
                .map(ArgumentValue::Integer)
                .ok_or_else(|| mismatch(spec, value))
        }
        ArgumentKind::Double => {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .filter(|f| f.is_finite())
                .map(ArgumentValue::Double)
                .ok_or_else(|| mismatch(spec, value))
        }
        ArgumentKind::String => match value {
            Value::String(s) => Ok(ArgumentValue::String(s.clone())),
            Value::Number(n) => Ok(ArgumentValue::String(n.to_string())),
            Value::Bool(b) => Ok(ArgumentValue::String(b.to_string())),
            other => Err(mismatch(spec, other)),
        },
        ArgumentKind::Choice {
            choices,
            display_names,
        } => {
            let candidate = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => return Err(mismatch(spec, other)),
            };
            if choices.contains(&candidate) {
                return Ok(ArgumentValue::Choice(candidate));
            }
            // A display name selects the choice at the same position.
            if let Some(idx) = display_names.iter().position(|d| *d == candidate) {
                return Ok(ArgumentValue::Choice(choices[idx].clone()));
            }
            Err(ValidationError::InvalidChoice {
                argument: spec.name().to_string(),
                value: candidate,
                choices: choices.clone(),
            })
        }
        ArgumentKind::Path => match value {
            Value::String(s) if !s.trim().is_empty() => Ok(ArgumentValue::Path(s.into())),
            other => Err(mismatch(spec, other)),
        },
    }
}

fn check_bounds(spec: &ArgumentSpec, value: &ArgumentValue) -> Result<(), ValidationError> {
    let numeric = match value {
        ArgumentValue::Integer(i) => *i as f64,
        ArgumentValue::Double(d) => *d,
        _ => return Ok(()),
    };
    let below = spec.min().is_some_and(|min| numeric < min);
    let above = spec.max().is_some_and(|max| numeric > max);
    if below || above {
        return Err(ValidationError::OutOfRange {
            argument: spec.name().to_string(),
            value: numeric,
            min: spec.min(),
            max: spec.max(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawArguments {
        serde_json::from_value(value).expect("raw arguments")
    }

    #[test]
    fn test_missing_required_names_argument() {
        let specs = vec![
            ArgumentSpec::boolean("flag", false).with_default(true),
            ArgumentSpec::string("label", true),
        ];
        let err = validate(&specs, &raw(json!({}))).unwrap_err();
        assert_eq!(err, ValidationError::Missing { argument: "label".to_string() });
    }

    #[test]
    fn test_null_counts_as_missing() {
        let specs = vec![ArgumentSpec::integer("count", true)];
        let err = validate(&specs, &raw(json!({ "count": null }))).unwrap_err();
        assert_eq!(err.argument(), "count");
    }

    #[test]
    fn test_first_offending_argument_reported() {
        let specs = vec![
            ArgumentSpec::integer("a", true),
            ArgumentSpec::integer("b", true),
        ];
        let err = validate(&specs, &raw(json!({ "a": "x" }))).unwrap_err();
        assert_eq!(err.argument(), "a");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let specs = vec![ArgumentSpec::boolean("flag", true)];
        let values = validate(&specs, &raw(json!({ "flag": true, "extra": 1 }))).unwrap();
        assert_eq!(values.len(), 1);
        assert!(!values.contains("extra"));
    }

    #[test]
    fn test_optional_takes_default_or_stays_unset() {
        let specs = vec![
            ArgumentSpec::boolean("with_default", false).with_default(false),
            ArgumentSpec::string("without_default", false),
        ];
        let values = validate(&specs, &RawArguments::new()).unwrap();
        assert_eq!(values.get_bool("with_default"), Some(false));
        assert!(!values.contains("without_default"));
    }

    #[test]
    fn test_string_coercions() {
        let specs = vec![
            ArgumentSpec::boolean("flag", true),
            ArgumentSpec::integer("count", true),
            ArgumentSpec::double("ratio", true),
            ArgumentSpec::string("label", true),
        ];
        let values = validate(
            &specs,
            &raw(json!({ "flag": "TRUE", "count": "7", "ratio": "0.25", "label": 12 })),
        )
        .unwrap();
        assert_eq!(values.get_bool("flag"), Some(true));
        assert_eq!(values.get_i64("count"), Some(7));
        assert_eq!(values.get_f64("ratio"), Some(0.25));
        assert_eq!(values.get_str("label"), Some("12"));
    }

    #[test]
    fn test_integer_rejects_fraction() {
        let specs = vec![ArgumentSpec::integer("count", true)];
        assert!(validate(&specs, &raw(json!({ "count": 2.0 }))).is_ok());
        let err = validate(&specs, &raw(json!({ "count": 2.5 }))).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_integer_rejects_out_of_range_float() {
        let specs = vec![ArgumentSpec::integer("count", true)];
        for big in [json!(1e20), json!(-1e20), json!(9.223372036854775807e18)] {
            let err = validate(&specs, &raw(json!({ "count": big }))).unwrap_err();
            assert!(matches!(err, ValidationError::TypeMismatch { .. }), "{big}");
        }
        let values = validate(&specs, &raw(json!({ "count": 4.0e15 }))).unwrap();
        assert_eq!(values.get("count"), Some(&ArgumentValue::Integer(4_000_000_000_000_000)));
    }

    #[test]
    fn test_boolean_rejects_number() {
        let specs = vec![ArgumentSpec::boolean("flag", true)];
        let err = validate(&specs, &raw(json!({ "flag": 1 }))).unwrap_err();
        match err {
            ValidationError::TypeMismatch { expected, found, .. } => {
                assert_eq!(expected, "boolean");
                assert_eq!(found, "number");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_choice_accepts_value_or_display_name() {
        let specs = vec![ArgumentSpec::choice("zone", ["z1", "z2"], true)
            .with_choice_display_names(["Core Zone", "Perimeter Zone"])];
        let by_value = validate(&specs, &raw(json!({ "zone": "z2" }))).unwrap();
        assert_eq!(by_value.get_str("zone"), Some("z2"));
        let by_display = validate(&specs, &raw(json!({ "zone": "Core Zone" }))).unwrap();
        assert_eq!(by_display.get_str("zone"), Some("z1"));

        let err = validate(&specs, &raw(json!({ "zone": "z3" }))).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidChoice { .. }));
    }

    #[test]
    fn test_bounds_checked() {
        let specs = vec![ArgumentSpec::double("ratio", true).with_min(0.0).with_max(1.0)];
        assert!(validate(&specs, &raw(json!({ "ratio": 1.0 }))).is_ok());
        let err = validate(&specs, &raw(json!({ "ratio": 1.5 }))).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn test_path_rejects_blank() {
        let specs = vec![ArgumentSpec::path("weather", true)];
        let err = validate(&specs, &raw(json!({ "weather": "  " }))).unwrap_err();
        assert_eq!(err.argument(), "weather");
    }

    #[test]
    fn test_validate_is_idempotent() {
        let specs = vec![
            ArgumentSpec::boolean("flag", true),
            ArgumentSpec::choice("frequency", ["Hourly", "Daily"], false).with_default("Hourly"),
        ];
        let input = raw(json!({ "flag": "false" }));
        let first = validate(&specs, &input).unwrap();
        let second = validate(&specs, &input).unwrap();
        assert_eq!(first, second);
        // Re-validating the rendered values yields the same values again.
        let third = validate(&specs, &first.to_raw()).unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn test_with_defaults_overlays_supplied() {
        let specs = vec![
            ArgumentSpec::boolean("a", true).with_default(true),
            ArgumentSpec::boolean("b", true).with_default(true),
        ];
        let seeded = with_defaults(&specs, &raw(json!({ "b": false, "other": 1 })));
        assert_eq!(seeded["a"], json!(true));
        assert_eq!(seeded["b"], json!(false));
        assert_eq!(seeded["other"], json!(1));
    }
}
