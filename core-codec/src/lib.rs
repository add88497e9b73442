//! # Core Codec Module
//!
//! Codec sessions over a native AC-3 / E-AC-3 engine.
//!
//! ## Overview
//!
//! This crate handles:
//! - The native engine contract (`CodecEngine`, `NativeDecoder`, `NativeEncoder`)
//! - Owned decode and encode sessions with typed errors
//! - Translation of native sample formats into portable descriptors
//! - Sample normalization helpers
//! - A deterministic reference engine (feature `reference-engine`)
//!
//! Sessions are synchronous. The `core-bridge` crate runs them on a dedicated
//! worker thread behind an asynchronous command protocol.

pub mod convert;
pub mod engine;
pub mod error;
pub mod format;
#[cfg(feature = "reference-engine")]
pub mod reference;
pub mod session;
pub mod types;

pub use convert::SampleConverter;
pub use engine::{
    CodecEngine, NativeDecoder, NativeEncoder, NativeError, NativeFrameInfo, NativePacket,
};
pub use error::{CodecError, Result};
pub use format::{FormatDescriptor, SampleFormat};
#[cfg(feature = "reference-engine")]
pub use reference::ReferenceEngine;
pub use session::{DecoderSession, EncoderSession};
pub use types::{
    CodecDescription, CodecVariant, DecodedAudio, EncodedOutput, EncoderParams, SessionKind,
};
