//! Error types for meta-model / schema transformation, loading and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the forward and reverse transformers.
///
/// Every variant aborts the current transformation call. Unresolved references
/// to packages that are simply not loaded are never reported here; they become
/// proxy classifiers instead.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("missing required field `{field}` in {context}")]
    MissingRequiredField { field: String, context: String },

    #[error("unsupported shape: {message}")]
    UnsupportedShape { message: String },

    #[error("opposite reference '{reference}' does not exist on '{target}'")]
    UnresolvedRequiredReference { reference: String, target: String },

    #[error("invalid identifier '{identifier}': {message}")]
    InvalidIdentifier { identifier: String, message: String },
}

impl TransformError {
    pub(crate) fn missing(field: &str, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.to_string(),
            context: context.into(),
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedShape {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_id(identifier: &str, message: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.to_string(),
            message: message.into(),
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while reading or writing documents and model files.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON in {origin}: {source}")]
    InvalidJson {
        /// File path, URL, or `<inline>` for in-memory input.
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. }
            | LoadError::ReadError { .. }
            | LoadError::WriteError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

/// Errors while checking a document against the closed vocabulary.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("invalid meta-schema: {message}")]
    MetaSchema { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },
}

/// Single validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::MetaSchema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("Coffee.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = LoadError::InvalidJson {
            origin: "Coffee.json".into(),
            source,
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn transform_error_messages() {
        let err = TransformError::missing("title", "top-level schema 'x/A.json'");
        assert_eq!(
            err.to_string(),
            "missing required field `title` in top-level schema 'x/A.json'"
        );
        assert_eq!(err.exit_code(), 2);

        let err = TransformError::unsupported("anonymous supertypes are not allowed");
        assert_eq!(
            err.to_string(),
            "unsupported shape: anonymous supertypes are not allowed"
        );
    }

    #[test]
    fn validate_error_exit_codes() {
        let err = ValidateError::Invalid {
            errors: vec![SchemaError {
                path: "/properties/name".into(),
                message: "unknown keyword".into(),
            }],
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn schema_error_display() {
        let err = SchemaError {
            path: "/methods/brew".into(),
            message: "expected object, got string".into(),
        };
        assert_eq!(err.to_string(), "/methods/brew: expected object, got string");
    }
}
