//! Error types for registration operations.

use thiserror::Error;

/// Main error type for registration operations.
///
/// Configuration and resource errors are fatal for the run; the pipeline
/// never retries them. Optimizer non-convergence is not an error (see
/// [`crate::optimizer::OptStatus`]).
#[derive(Error, Debug)]
pub enum RegiError {
    #[error("view index {index} out of range ({num_views} views)")]
    OutOfRange { index: usize, num_views: usize },

    /// Hardware context or buffer allocation failure; fatal for the
    /// owning metric instance.
    #[error("resource allocation failed: {0}")]
    ResourceAllocation(String),

    /// Precondition violation: mis-configured regularizer, unbound
    /// images, mismatched view counts.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("projection store error: {0}")]
    Store(#[from] xrt_io::StoreError),
}

pub type Result<T> = std::result::Result<T, RegiError>;

impl RegiError {
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::ResourceAllocation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegiError::OutOfRange {
            index: 3,
            num_views: 2,
        };
        assert_eq!(err.to_string(), "view index 3 out of range (2 views)");
    }
}
