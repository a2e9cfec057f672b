use thiserror::Error;

use crate::path::ValuePath;

/// Errors produced by the merge and diff engines.
///
/// All three kinds are integration errors: a call either completes with a
/// full result or fails with one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A value's shape does not match its declared schema node.
    #[error("schema mismatch at {path}: expected {expected}, found {found}")]
    SchemaMismatch {
        path: ValuePath,
        expected: String,
        found: String,
    },

    /// A path was requested that does not exist in the schema.
    #[error("path not found in schema: {path}")]
    PathNotFound { path: ValuePath },

    /// Configuration supplied a value the schema does not allow it to set.
    #[error("schema violation at {path}: {reason}")]
    SchemaViolation { path: ValuePath, reason: String },
}

impl EngineError {
    pub fn mismatch(path: &ValuePath, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            path: path.clone(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn not_found(path: &ValuePath) -> Self {
        Self::PathNotFound { path: path.clone() }
    }

    pub fn violation(path: &ValuePath, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// The path the error refers to.
    pub fn path(&self) -> &ValuePath {
        match self {
            Self::SchemaMismatch { path, .. }
            | Self::PathNotFound { path }
            | Self::SchemaViolation { path, .. } => path,
        }
    }
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;
