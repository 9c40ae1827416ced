//! Runner errors.

use std::path::PathBuf;

/// Errors loading or persisting workflow inputs and outputs.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("workflow has no steps")]
    EmptyWorkflow,

    #[error("step {index} ('{name}'): {source}")]
    UnknownStepModule {
        index: usize,
        name: String,
        #[source]
        source: measure_core::RegistryError,
    },
}

pub type Result<T> = std::result::Result<T, RunnerError>;
