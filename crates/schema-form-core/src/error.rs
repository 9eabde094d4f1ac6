//! Error types for form building and layout mutation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes.
///
/// Variant names and their serialized `snake_case` strings are part of the
/// public contract and must not change across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// JSON (de)serialization error.
    JsonParseError,
    /// Syntactically invalid JSON Pointer.
    InvalidPointer,
    /// Well-formed pointer with no value at that location.
    PointerNotFound,
    /// Layout and schema disagree (unknown control type, unresolvable binding).
    SchemaMismatch,
    /// A `$ref` could not be resolved within the schema.
    UnresolvableRef,
    /// Maximum synthesis depth exceeded.
    RecursionDepthExceeded,
    /// A mutation was called with a node context that does not address the form.
    InvalidContext,
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("JSON (de)serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid JSON Pointer {pointer:?}: {message}")]
    InvalidPointer { pointer: String, message: String },

    #[error("No value at {path}")]
    PointerNotFound { path: String },

    #[error("Schema mismatch at {path}: {message}")]
    SchemaMismatch { path: String, message: String },

    #[error("Unresolvable $ref at {path}: {reference}")]
    UnresolvableRef { path: String, reference: String },

    #[error("Recursion depth exceeded at {path} (max: {max_depth})")]
    RecursionDepthExceeded { path: String, max_depth: usize },

    #[error("Invalid node context: {message}")]
    InvalidContext { message: String },
}

impl FormError {
    /// Returns the stable error code for this error variant.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            FormError::JsonError(_) => ErrorCode::JsonParseError,
            FormError::InvalidPointer { .. } => ErrorCode::InvalidPointer,
            FormError::PointerNotFound { .. } => ErrorCode::PointerNotFound,
            FormError::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            FormError::UnresolvableRef { .. } => ErrorCode::UnresolvableRef,
            FormError::RecursionDepthExceeded { .. } => ErrorCode::RecursionDepthExceeded,
            FormError::InvalidContext { .. } => ErrorCode::InvalidContext,
        }
    }

    /// Returns the pointer context, if available.
    pub fn path(&self) -> Option<&str> {
        match self {
            FormError::JsonError(_) => None,
            FormError::InvalidPointer { pointer, .. } => Some(pointer),
            FormError::PointerNotFound { path } => Some(path),
            FormError::SchemaMismatch { path, .. } => Some(path),
            FormError::UnresolvableRef { path, .. } => Some(path),
            FormError::RecursionDepthExceeded { path, .. } => Some(path),
            FormError::InvalidContext { .. } => None,
        }
    }

    /// Produces a structured JSON error.
    ///
    /// Format: `{"code": "...", "message": "...", "path": "..." | null}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "path": self.path(),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
