//! Error types for osm2parquet
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for osm2parquet
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Input Errors
    // ============================================================================
    #[error("Failed to decode record: {message}")]
    Decode { message: String },

    #[error("XML parsing error at byte {position}: {message}")]
    XmlParse { position: usize, message: String },

    #[error("PBF decoding error: {0}")]
    Pbf(#[from] osmpbf::Error),

    // ============================================================================
    // Encoding Errors
    // ============================================================================
    #[error("Unsupported relation member type '{member_type}' in relation {relation_id}")]
    UnsupportedMemberType {
        relation_id: i64,
        member_type: String,
    },

    #[error("Row batch invariant violated: {message}")]
    BatchInvariant { message: String },

    #[error("Conversion aborted after an earlier fatal error")]
    Aborted,

    // ============================================================================
    // Arrow/Parquet Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an XML parse error at a byte offset
    pub fn xml(position: usize, message: impl Into<String>) -> Self {
        Self::XmlParse {
            position,
            message: message.into(),
        }
    }

    /// Create a batch invariant error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::BatchInvariant {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Check if this error must abort the whole conversion
    ///
    /// Input-side errors are reported by the record source and may be
    /// handled by the caller; everything raised while encoding or persisting
    /// a batch leaves the output in an unusable state.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::UnsupportedMemberType { .. }
            | Error::BatchInvariant { .. }
            | Error::Aborted
            | Error::Arrow(_)
            | Error::Parquet(_)
            | Error::Output { .. }
            | Error::Io(_) => true,
            _ => false,
        }
    }
}

/// Result type alias for osm2parquet
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
