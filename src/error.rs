//! Error types for PoolCopy
//!
//! The raw copy path has no error channel: bad pointers and overlapping
//! ranges are contract violations. Errors here cover the safe surface only,
//! i.e. pool construction, slice copies and configuration.

use thiserror::Error;

/// Main error type for PoolCopy operations
#[derive(Error, Debug)]
pub enum PoolCopyError {
    /// Worker threads could not be started
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Source and destination slices differ in length
    #[error("Length mismatch: destination is {dst} bytes, source is {src} bytes")]
    LengthMismatch {
        /// Destination length
        dst: usize,
        /// Source length
        src: usize,
    },

    /// Not enough free memory for the requested buffers
    #[error("Insufficient memory: need {required} bytes, have {available} bytes")]
    InsufficientMemory {
        /// Bytes needed for source and destination
        required: u64,
        /// Bytes reported available
        available: u64,
    },

    /// Report serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        /// What was being done
        context: String,
        /// Underlying error
        #[source]
        source: Box<PoolCopyError>,
    },
}

impl PoolCopyError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a thread pool error
    pub fn thread_pool(message: impl Into<String>) -> Self {
        Self::ThreadPoolError(message.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if the error was caused by user input rather than the host
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::ConfigError(_) | Self::LengthMismatch { .. } => true,
            Self::WithContext { source, .. } => source.is_user_error(),
            _ => false,
        }
    }
}

/// Result type alias for PoolCopy operations
pub type Result<T> = std::result::Result<T, PoolCopyError>;

impl From<serde_json::Error> for PoolCopyError {
    fn from(err: serde_json::Error) -> Self {
        PoolCopyError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_message() {
        let err = PoolCopyError::LengthMismatch { dst: 10, src: 12 };
        assert_eq!(
            err.to_string(),
            "Length mismatch: destination is 10 bytes, source is 12 bytes"
        );
    }

    #[test]
    fn test_user_error_classification() {
        assert!(PoolCopyError::config("bad block size").is_user_error());
        assert!(!PoolCopyError::thread_pool("spawn failed").is_user_error());

        let wrapped = PoolCopyError::config("zero iterations").with_context("bench");
        assert!(wrapped.is_user_error());
        assert_eq!(wrapped.to_string(), "bench: Configuration error: zero iterations");
    }

    #[test]
    fn test_from_serde_json() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: PoolCopyError = json_err.into();
        assert!(matches!(err, PoolCopyError::SerializationError(_)));
    }
}
