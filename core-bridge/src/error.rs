//! # Bridge Error Types
//!
//! Errors surfaced by the bridge client and the codec adapters.

use core_codec::CodecError;
use thiserror::Error;

use crate::protocol::CommandKind;

/// Errors that can occur while talking to the background codec worker.
#[derive(Error, Debug)]
pub enum BridgeError {
    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// The worker rejected the command.
    #[error(transparent)]
    Codec(#[from] CodecError),

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// A response arrived for an id with no pending command.
    #[error("Response for unknown correlation id {0}")]
    UnknownCorrelationId(u64),

    /// The worker answered with a response of the wrong kind.
    #[error("Expected {expected} response, got {actual}")]
    UnexpectedResponse {
        expected: CommandKind,
        actual: CommandKind,
    },

    /// The client saw a protocol violation and no longer accepts commands.
    #[error("Bridge client is poisoned by an earlier protocol violation")]
    Poisoned,

    /// The engine reported a packet duration other than the frame size.
    #[error("Packet duration {reported} differs from frame size {expected}")]
    DurationMismatch { expected: i64, reported: i64 },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The worker thread is gone or dropped the command.
    #[error("Codec worker is unavailable")]
    WorkerUnavailable,

    // ========================================================================
    // Adapter Errors
    // ========================================================================
    /// Caller input did not satisfy the adapter's contract.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation attempted before `init` or after `close`.
    #[error("Codec adapter not initialized")]
    NotInitialized,

    /// The adapter cannot handle the requested configuration.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfig(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Runtime error from core-runtime.
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl BridgeError {
    /// Returns `true` for programming or integration errors.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            BridgeError::Codec(err) => err.is_protocol_violation(),
            BridgeError::UnknownCorrelationId(_)
            | BridgeError::UnexpectedResponse { .. }
            | BridgeError::Poisoned
            | BridgeError::DurationMismatch { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the session is still usable and the caller may
    /// continue past the failed input.
    pub fn is_recoverable(&self) -> bool {
        match self {
            BridgeError::Codec(err) => err.is_recoverable(),
            _ => false,
        }
    }

    /// The codec error behind this failure, if any.
    pub fn codec_error(&self) -> Option<&CodecError> {
        match self {
            BridgeError::Codec(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_errors_pass_through() {
        let err: BridgeError = CodecError::DecodeFailed { code: -1 }.into();
        assert_eq!(err.to_string(), "Decode failed with error code -1");
        assert!(err.is_recoverable());
        assert!(!err.is_protocol_violation());
        assert_eq!(err.codec_error(), Some(&CodecError::DecodeFailed { code: -1 }));
    }

    #[test]
    fn test_protocol_classification() {
        assert!(BridgeError::UnknownCorrelationId(9).is_protocol_violation());
        assert!(BridgeError::from(CodecError::InvalidHandle).is_protocol_violation());
        assert!(!BridgeError::WorkerUnavailable.is_protocol_violation());
        assert!(!BridgeError::NotInitialized.is_recoverable());

        let err = BridgeError::UnexpectedResponse {
            expected: CommandKind::Encode,
            actual: CommandKind::Decode,
        };
        assert_eq!(err.to_string(), "Expected encode response, got decode");
    }
}
