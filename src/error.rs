//! Errors raised for caller mistakes
//!
//! Noisy field data never produces an error: malformed records are skipped and
//! degenerate statistics fall back to defaults. The variants below describe
//! arguments that can only come from a caller bug or a broken configuration
//! file, so processing stops with a clear diagnostic.

use thiserror::Error;

/// Errors that can occur while configuring or querying an analysis
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Unknown hardware category: {0}")]
    UnknownCategory(String),

    #[error("Invalid component pattern for '{pass}': {source}")]
    InvalidPattern {
        pass: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid tolerance for {family}: min={min}%, max={max}% (need 0 <= min <= max)")]
    InvalidTolerance { family: String, min: f64, max: f64 },

    #[error("Duplicate policy pass '{0}'")]
    DuplicatePass(String),

    #[error("Unknown group: {0}")]
    UnknownGroup(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fleet analysis operations
pub type Result<T> = std::result::Result<T, AuditError>;
