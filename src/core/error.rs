//! Error handling and error types for boosted tree evaluation.
//!
//! Every fallible operation in the crate returns [`Result`], and failures are
//! reported synchronously to the caller. Nothing in this crate retries or
//! recovers locally: configuration problems are fatal at construction time and
//! input problems are fatal for the call that saw them.

use std::io;
use thiserror::Error;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum BoostedTreesError {
    /// Malformed or contradictory configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },

    /// Malformed call input (feature tensors, seed)
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What is wrong with the input
        message: String,
    },

    /// Tensor dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected size
        expected: String,
        /// Size found
        actual: String,
    },

    /// Tree or ensemble structure violates its invariants
    #[error("Invalid model: {message}")]
    InvalidModel {
        /// Violated invariant
        message: String,
    },

    /// Worker pool construction or lock poisoning
    #[error("Threading error: {message}")]
    Threading {
        /// Failure description
        message: String,
    },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        /// Underlying I/O error
        #[from]
        source: io::Error,
    },

    /// JSON configuration errors
    #[error("JSON error: {source}")]
    Json {
        /// Underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// TOML configuration errors
    #[error("TOML error: {source}")]
    Toml {
        /// Underlying TOML error
        #[from]
        source: toml::de::Error,
    },
}

/// Type alias for Results using BoostedTreesError
pub type Result<T> = std::result::Result<T, BoostedTreesError>;

impl BoostedTreesError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        BoostedTreesError::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        BoostedTreesError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch<E, A>(expected: E, actual: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        BoostedTreesError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid model error
    pub fn invalid_model<S: Into<String>>(message: S) -> Self {
        BoostedTreesError::InvalidModel {
            message: message.into(),
        }
    }

    /// Create a threading error
    pub fn threading<S: Into<String>>(message: S) -> Self {
        BoostedTreesError::Threading {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            BoostedTreesError::Config { .. } => false,
            BoostedTreesError::InvalidArgument { .. } => false,
            BoostedTreesError::DimensionMismatch { .. } => false,
            BoostedTreesError::InvalidModel { .. } => false,
            BoostedTreesError::Threading { .. } => true,
            BoostedTreesError::IO { .. } => false,
            BoostedTreesError::Json { .. } => false,
            BoostedTreesError::Toml { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            BoostedTreesError::Config { .. } => "config",
            BoostedTreesError::InvalidArgument { .. } => "invalid_argument",
            BoostedTreesError::DimensionMismatch { .. } => "dimension_mismatch",
            BoostedTreesError::InvalidModel { .. } => "invalid_model",
            BoostedTreesError::Threading { .. } => "threading",
            BoostedTreesError::IO { .. } => "io",
            BoostedTreesError::Json { .. } => "json",
            BoostedTreesError::Toml { .. } => "toml",
        }
    }

    /// True for errors caused by the shape or content of call inputs.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            BoostedTreesError::InvalidArgument { .. } | BoostedTreesError::DimensionMismatch { .. }
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for BoostedTreesError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        BoostedTreesError::threading(format!("lock poisoned: {}", err))
    }
}
