//! Error types for experiment configuration and training

use thiserror::Error;

/// Errors raised by the experiment pipeline before or during training.
///
/// Filesystem and rendering failures are not listed here: those
/// propagate as `anyhow` errors from the infra layer.
#[derive(Debug, Error, PartialEq)]
pub enum ExperimentError {
    /// The sequence must have at least two points to form one
    /// input/target pair
    #[error("Invalid sequence length: {seq_len} (need at least 2 samples)")]
    InvalidSequenceLength {
        /// Requested sequence length
        seq_len: usize,
    },

    /// A batch needs at least one element
    #[error("Invalid batch size: {batch_size}")]
    InvalidBatchSize {
        /// Requested batch size
        batch_size: usize,
    },

    /// Any other out-of-range configuration value
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Which value is wrong and why
        reason: String,
    },

    /// Training diverged
    #[error("Loss became non-finite at epoch {epoch}: {loss}")]
    NonFiniteLoss {
        /// Zero-based epoch index
        epoch: usize,
        /// The offending loss value
        loss: f64,
    },
}

impl ExperimentError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, ExperimentError>;
