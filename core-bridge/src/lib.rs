//! # Core Bridge
//!
//! Runs AC-3 and E-AC-3 codec sessions on a dedicated background thread and
//! exposes them to async callers.
//!
//! ## Layers
//!
//! - [`protocol`]: commands and responses exchanged with the worker
//! - [`BridgeClient`]: correlation ids, pending commands and typed helpers
//! - [`accumulator`]: fixed-size frame buffering for the encoder
//! - [`adapter`]: decoder and encoder adapters for hosts
//!
//! The worker thread owns every native context. Callers only hold
//! [`SessionHandle`]s, which go stale once their session is closed.

pub mod accumulator;
pub mod adapter;
pub mod arena;
pub mod client;
pub mod error;
pub mod protocol;
mod worker;

pub use accumulator::{FrameAccumulator, PendingFrame};
pub use adapter::{
    Ac3Decoder, Ac3Encoder, AudioDecoderAdapter, AudioEncoderAdapter, EncodedPacket,
    EncoderConfig, PcmChunk,
};
pub use arena::SessionHandle;
pub use client::{BridgeClient, EncoderHandle};
pub use error::{BridgeError, Result};
pub use protocol::{Command, CommandKind, Envelope, Response, ResponseData};
