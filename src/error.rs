//! Error types for pipeline construction and execution
//!
//! Errors fall into three groups: build errors raised before any element
//! flows, element errors raised by a stage function while a sequence is
//! being pulled, and usage errors raised when an operation is applied to
//! data it cannot handle.

/// Main error type for pipeline operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    /// Invalid pipeline configuration, detected before any element is pulled
    #[error("Pipeline build error: {0}")]
    Build(String),
    /// An element could not be processed as the stage expected
    #[error("Type error: {0}")]
    Type(String),
    /// An operation was applied to data it does not support
    #[error("Usage error: {0}")]
    Usage(String),
    /// Custom error raised by a stage function
    #[error("Stream error: {0}")]
    Custom(String),
}

impl StreamError {
    pub fn custom(msg: impl Into<String>) -> Self {
        StreamError::Custom(msg.into())
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        StreamError::Type(msg.into())
    }
}

/// Result type for pipeline operations
pub type StreamResult<T> = Result<T, StreamError>;
