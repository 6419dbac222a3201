//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// The first group are request validation errors. They are raised before any
/// collection is queried and map to a 4xx-style response at the boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid range: from ({from}) is after to ({to})")]
    InvalidRange { from: String, to: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Missing tenant context")]
    MissingTenantContext,

    #[error("Unsupported module: {0}")]
    UnsupportedModule(String),

    #[error("Unsupported format: {0} (expected pdf or excel)")]
    UnsupportedFormat(String),

    #[error("Upstream query failed for {source_key}: {message}")]
    UpstreamQuery { source_key: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an upstream query error for a named source or collection
    pub fn upstream(source_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamQuery {
            source_key: source_key.into(),
            message: message.into(),
        }
    }

    /// Create an export error
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// True for errors caused by the request itself rather than the store
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidRange { .. }
                | Error::InvalidDate(_)
                | Error::MissingTenantContext
                | Error::UnsupportedModule(_)
                | Error::UnsupportedFormat(_)
        )
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Export(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON responses)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let kind = if e.is_validation() { "validation" } else { "failure" };
                let mut context = HashMap::new();
                context.insert("kind".to_string(), serde_json::json!(kind));
                Self::fail_with_context(e.to_string(), context)
            }
        }
    }
}
