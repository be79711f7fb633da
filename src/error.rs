//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.

use thiserror::Error;

/// Main error type for ancestor building and matching
#[derive(Error, Debug)]
pub enum AncestralError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors when writing ancestor descriptors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Array dimensions disagree with the declared sizes
    #[error("Shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// An allele outside {0, 1, unknown}
    #[error("Invalid allele {value} at site {site}")]
    InvalidAllele { site: usize, value: u8 },

    /// Model parameters outside their domain (non-positive rates, NaN)
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// Query haplotype has no known site
    #[error("Query haplotype is entirely unknown")]
    EmptyQuery,

    /// Ancestors requested out of frequency order
    #[error("Ancestor {requested} requested after {last}; builds must follow frequency order")]
    OutOfOrder { requested: usize, last: usize },

    /// Internal chain consistency failure. Indicates a bug, never bad input.
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    /// Parse errors
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Configuration errors (invalid CLI arguments)
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Type alias for Results using AncestralError
pub type Result<T> = std::result::Result<T, AncestralError>;

impl AncestralError {
    /// Create a shape mismatch error
    pub fn shape(what: &'static str, expected: usize, found: usize) -> Self {
        Self::ShapeMismatch {
            what,
            expected,
            found,
        }
    }

    /// Create an invalid parameter error
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create an invariant violation
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}
