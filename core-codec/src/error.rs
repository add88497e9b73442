//! # Codec Error Types
//!
//! Errors raised by codec sessions and reported back across the bridge.

use thiserror::Error;

use crate::types::{CodecVariant, SessionKind};

/// Errors that can occur while driving a native codec session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    // ========================================================================
    // Initialization Errors
    // ========================================================================
    /// The engine could not allocate a context for the requested parameters.
    #[error("Failed to initialize {codec} codec (error code {code})")]
    InitFailed { codec: CodecVariant, code: i32 },

    // ========================================================================
    // Processing Errors
    // ========================================================================
    /// Decode produced a native sample format with no portable tag.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(i32),

    /// The engine could not provide a staging buffer.
    #[error("Failed to allocate native buffer (error code {code})")]
    BufferAllocation { code: i32 },

    /// The native decode step returned an error.
    #[error("Decode failed with error code {code}")]
    DecodeFailed { code: i32 },

    /// The native encode step returned an error.
    #[error("Encode failed with error code {code}")]
    EncodeFailed { code: i32 },

    // ========================================================================
    // Contract Violations
    // ========================================================================
    /// Encode input was not exactly one native frame.
    #[error("Expected {expected} interleaved samples per frame, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    /// The engine produced other than one packet for one input frame.
    #[error("Engine produced {produced} packets for one frame, expected exactly 1")]
    PacketCountMismatch { produced: usize },

    /// Decoded output did not match the frame description.
    #[error("Malformed engine output: {0}")]
    MalformedOutput(String),

    /// The handle does not name a live session.
    #[error("Invalid or stale session handle")]
    InvalidHandle,

    /// The handle names a session of the other direction.
    #[error("Wrong session kind, expected {expected}")]
    SessionKindMismatch { expected: SessionKind },

    // ========================================================================
    // Transport
    // ========================================================================
    /// A failure described by the remote side as text.
    #[error("{0}")]
    Remote(String),
}

impl CodecError {
    /// Native return code carried by this error, if any.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            CodecError::InitFailed { code, .. }
            | CodecError::BufferAllocation { code }
            | CodecError::DecodeFailed { code }
            | CodecError::EncodeFailed { code } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` for programming or integration errors.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            CodecError::FrameSizeMismatch { .. }
                | CodecError::PacketCountMismatch { .. }
                | CodecError::MalformedOutput(_)
                | CodecError::InvalidHandle
                | CodecError::SessionKindMismatch { .. }
        )
    }

    /// Returns `true` if the session stays usable and the caller may skip the
    /// offending input and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CodecError::UnsupportedFormat(_)
                | CodecError::BufferAllocation { .. }
                | CodecError::DecodeFailed { .. }
                | CodecError::EncodeFailed { .. }
        )
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
