//! Error types for veil-state operations.

use thiserror::Error;

/// Result type alias for veil-state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors raised by the façade, snapshot, and store layers.
///
/// User-supplied mutators propagate their own errors unchanged; the engine
/// never catches or retries them. Operations that fail leave no patch behind.
#[derive(Debug, Error)]
pub enum StateError {
    /// A reflective operation the engine does not support: wrong-kind keys,
    /// deleting intrinsic sequence attributes, wrapping a non-container, or
    /// access through a revoked façade.
    #[error("unsupported operation: {message}")]
    UnsupportedOperation {
        /// Description of the rejected operation.
        message: String,
    },

    /// Façade bookkeeping was observed in an impossible state. This is a
    /// programmer error, not a recoverable condition.
    #[error("invariant violation: {message}")]
    InvariantViolation {
        /// Description of what was incoherent.
        message: String,
    },
}

impl StateError {
    /// Create an unsupported-operation error.
    #[inline]
    pub fn unsupported(message: impl Into<String>) -> Self {
        StateError::UnsupportedOperation {
            message: message.into(),
        }
    }

    /// Create an invariant-violation error.
    #[inline]
    pub fn invariant(message: impl Into<String>) -> Self {
        StateError::InvariantViolation {
            message: message.into(),
        }
    }
}
