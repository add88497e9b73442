//! # Codec Adapters
//!
//! Async decoder and encoder front-ends over a shared [`crate::BridgeClient`].

mod decoder;
mod encoder;
mod traits;

pub use decoder::Ac3Decoder;
pub use encoder::{Ac3Encoder, MAX_CHANNELS};
pub use traits::{
    AudioDecoderAdapter, AudioEncoderAdapter, EncodedPacket, EncoderConfig, PcmChunk,
};
