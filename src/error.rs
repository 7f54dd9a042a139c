//! Error type shared by the step transform, the loader and the driver.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = PreprocessError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum PreprocessError {
    /// A required key is absent from the record. The field is a dotted path
    /// such as `action.world_vector`.
    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("field `{field}` expected {expected} element(s), got {actual}")]
    ShapeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("field `{field}` expected {expected}, got {actual}")]
    InvalidType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A domain helper (quaternion conversion, instruction cleaning) rejected its input.
    #[error("{helper} failed: {reason}")]
    Helper {
        helper: &'static str,
        reason: String,
    },

    #[error("IO error occurred on path: {1}")]
    Io(#[source] std::io::Error, PathBuf),

    #[error("malformed episode at {}:{line}", .path.display())]
    MalformedEpisode {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to write output")]
    Write(#[source] std::io::Error),

    #[error("dataset directory not found: {}", .0.display())]
    DatasetNotFound(PathBuf),

    #[error("no .jsonl shards in dataset directory: {}", .0.display())]
    EmptyDataset(PathBuf),

    #[error("unknown dataset: {0}")]
    UnknownDataset(String),
}

impl PreprocessError {
    pub(crate) fn helper(helper: &'static str, reason: impl Into<String>) -> Self {
        Self::Helper {
            helper,
            reason: reason.into(),
        }
    }

    /// Whether the error describes a bad record rather than a broken run.
    ///
    /// Only these are eligible for the `skip` malformed-step policy.
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_)
                | Self::ShapeMismatch { .. }
                | Self::InvalidType { .. }
                | Self::Helper { .. }
        )
    }
}

/// JSON type name used in `InvalidType` messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
