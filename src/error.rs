//! Error hierarchy for the decision kernel.
//!
//! Near-zero-mass normalization is the only condition absorbed silently
//! (uniform fallback in [`crate::math::normalize`]). Everything else that
//! would leave the kernel holding inconsistent state surfaces here.

use thiserror::Error;

/// Root error type for all kernel failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NepsisError {
    /// Invalid input: out-of-range prior, empty or duplicate hypothesis set,
    /// out-of-range configuration value.
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed exclusivity matrix.
    #[error("exclusivity error: {0}")]
    Exclusivity(String),

    /// Lookup by a hypothesis id the state does not hold.
    #[error("unknown hypothesis: {0}")]
    UnknownHypothesis(String),

    /// Structural mismatch between state vectors, index map or matrices.
    #[error("inconsistent state: {0}")]
    Inconsistent(String),

    /// JSON configuration or audit output could not be parsed or encoded.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type NepsisResult<T> = Result<T, NepsisError>;
