//! Error taxonomy for module invocations.
//!
//! Every error here is recoverable at the module boundary: the invocation
//! driver turns them into a failed [`ModuleResult`](crate::ModuleResult)
//! instead of letting them escape to the orchestrator.

use serde::{Deserialize, Serialize};

/// Errors produced while checking raw argument values against a schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("required argument '{argument}' is missing")]
    Missing { argument: String },

    #[error("argument '{argument}' expected {expected}, found {found}")]
    TypeMismatch {
        argument: String,
        expected: String,
        found: String,
    },

    #[error("argument '{argument}' value '{value}' is not one of [{}]", .choices.join(", "))]
    InvalidChoice {
        argument: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("argument '{argument}' value {value} is outside [{}, {}]", fmt_bound(.min), fmt_bound(.max))]
    OutOfRange {
        argument: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
}

fn fmt_bound(bound: &Option<f64>) -> String {
    bound.map(|b| b.to_string()).unwrap_or_else(|| "..".to_string())
}

impl ValidationError {
    /// Name of the offending argument.
    pub fn argument(&self) -> &str {
        match self {
            Self::Missing { argument }
            | Self::TypeMismatch { argument, .. }
            | Self::InvalidChoice { argument, .. }
            | Self::OutOfRange { argument, .. } => argument,
        }
    }
}

/// Errors from a results store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResultsError {
    #[error("results store unavailable: {0}")]
    Unavailable(String),

    #[error("results store is not open")]
    NotOpen,

    #[error("results query failed: {0}")]
    Query(String),
}

/// Errors that can end a module invocation.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("cannot find last model")]
    MissingModel,

    #[error("cannot find last results store")]
    MissingResults,

    #[error("execution error: {0}")]
    Execution(String),

    #[error("results error: {0}")]
    Results(#[from] ResultsError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid invocation state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl ModuleError {
    /// Shorthand for an [`ModuleError::Execution`] error.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Map to the serialisable failure kind recorded on a result.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(e) => FailureKind::Validation {
                argument: e.argument().to_string(),
            },
            Self::MissingModel => FailureKind::MissingModel,
            Self::MissingResults => FailureKind::MissingResults,
            Self::Execution(_)
            | Self::Results(_)
            | Self::Io(_)
            | Self::InvalidTransition { .. } => FailureKind::Execution,
        }
    }
}

/// Why an invocation failed, as recorded on its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    Validation { argument: String },
    MissingModel,
    MissingResults,
    Execution,
}

/// Errors parsing an engine output request from its text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestParseError {
    #[error("output request is empty")]
    Empty,

    #[error("output request '{0}' is missing its ';' terminator")]
    MissingTerminator(String),

    #[error("output request '{0}' has no object type")]
    MissingType(String),
}

/// Errors from the module registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("module registry is not initialized")]
    NotInitialized,

    #[error("module registry is already initialized")]
    AlreadyInitialized,

    #[error("module already registered: {0}")]
    DuplicateModule(String),

    #[error("unknown module: {0}")]
    UnknownModule(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_argument() {
        let err = ValidationError::Missing {
            argument: "flag".to_string(),
        };
        assert_eq!(err.argument(), "flag");
        assert!(err.to_string().contains("'flag'"));
    }

    #[test]
    fn test_out_of_range_display_open_bound() {
        let err = ValidationError::OutOfRange {
            argument: "ratio".to_string(),
            value: 1.5,
            min: Some(0.0),
            max: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("1.5"));
        assert!(msg.contains("[0, ..]"));
    }

    #[test]
    fn test_module_error_kind_mapping() {
        assert_eq!(ModuleError::MissingModel.kind(), FailureKind::MissingModel);
        assert_eq!(ModuleError::MissingResults.kind(), FailureKind::MissingResults);
        assert_eq!(
            ModuleError::from(ResultsError::NotOpen).kind(),
            FailureKind::Execution
        );
        let err: ModuleError = ValidationError::Missing {
            argument: "zone".to_string(),
        }
        .into();
        assert_eq!(
            err.kind(),
            FailureKind::Validation {
                argument: "zone".to_string()
            }
        );
    }

    #[test]
    fn test_failure_kind_serializes_tagged() {
        let json = serde_json::to_value(FailureKind::MissingModel).unwrap();
        assert_eq!(json["kind"], "missing_model");
    }
}
