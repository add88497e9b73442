//! # Codec Adapter Traits
//!
//! Host-facing decoder and encoder contracts built on the bridge client.
//!
//! ## Threading Model
//!
//! Adapters never touch a native context. Every operation becomes one or more
//! commands on the background worker, and each command is awaited before the
//! next is issued, so an adapter's commands stay in order.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use core_bridge::adapter::{Ac3Encoder, AudioEncoderAdapter, EncoderConfig, PcmChunk};
//! use core_bridge::BridgeClient;
//! use core_codec::{CodecVariant, ReferenceEngine};
//! use core_runtime::BridgeConfig;
//!
//! # async fn example() -> core_bridge::Result<()> {
//! let client = Arc::new(BridgeClient::spawn(ReferenceEngine::new(), BridgeConfig::default())?);
//! let mut encoder = Ac3Encoder::new(client);
//! encoder
//!     .init(CodecVariant::Ac3, EncoderConfig::new(2, 48_000).with_bitrate(192_000))
//!     .await?;
//!
//! let chunk = PcmChunk::new(vec![0.0; 2 * 4000], 2, 48_000, 0);
//! let mut packets = encoder.encode(chunk).await?;
//! packets.extend(encoder.flush().await?);
//! encoder.close().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use core_codec::{CodecDescription, CodecVariant, DecodedAudio};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Media Types
// ============================================================================

/// A compressed packet entering a decoder or leaving an encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPacket {
    pub data: Bytes,
    /// Presentation timestamp in samples.
    pub timestamp: i64,
    /// Duration in samples, when known.
    pub duration: Option<i64>,
    pub key_frame: bool,
    /// Stream description, attached to the first packet of an encoder run.
    pub metadata: Option<CodecDescription>,
}

impl EncodedPacket {
    /// Create a packet for decoding.
    pub fn new(data: impl Into<Bytes>, timestamp: i64) -> Self {
        Self {
            data: data.into(),
            timestamp,
            duration: None,
            key_frame: true,
            metadata: None,
        }
    }

    /// Create a packet produced by an encoder.
    ///
    /// AC-3 frames are independently decodable, so every packet is a key frame.
    pub fn encoded(data: Bytes, timestamp: i64, duration: i64) -> Self {
        Self {
            data,
            timestamp,
            duration: Some(duration),
            key_frame: true,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: CodecDescription) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Interleaved `f32` PCM handed to an encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcmChunk {
    pub samples: Vec<f32>,
    pub channels: u32,
    pub sample_rate: u32,
    /// Timestamp of the first frame, in samples.
    pub timestamp: i64,
}

impl PcmChunk {
    pub fn new(samples: Vec<f32>, channels: u32, sample_rate: u32, timestamp: i64) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            timestamp,
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// Encoder parameters supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderConfig {
    pub channels: u32,
    pub sample_rate: u32,
    /// Target bitrate in bits per second. Required by `init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
}

impl EncoderConfig {
    pub fn new(channels: u32, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
            bitrate: None,
        }
    }

    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = Some(bitrate);
        self
    }
}

// ============================================================================
// Adapter Traits
// ============================================================================

/// Decodes AC-3 family packets into PCM.
#[async_trait]
pub trait AudioDecoderAdapter: Send + Sync {
    /// Open a decoder session on the worker.
    ///
    /// Re-initializing closes the previous session first.
    async fn init(&mut self, variant: CodecVariant) -> Result<()>;

    /// Decode one packet into a single frame of PCM.
    ///
    /// # Errors
    ///
    /// Corrupt input surfaces as [`crate::BridgeError::Codec`]; the session
    /// stays usable for later packets.
    async fn decode(&mut self, packet: EncodedPacket) -> Result<DecodedAudio>;

    /// Drop decoder state without closing the session.
    async fn flush(&mut self) -> Result<()>;

    /// Release the session. A second call returns `NotInitialized`.
    async fn close(&mut self) -> Result<()>;
}

/// Encodes arbitrarily sized PCM chunks into AC-3 family packets.
#[async_trait]
pub trait AudioEncoderAdapter: Send + Sync {
    async fn init(&mut self, variant: CodecVariant, config: EncoderConfig) -> Result<()>;

    /// Buffer `chunk` and encode every complete frame.
    ///
    /// Returns the packets produced, possibly none.
    async fn encode(&mut self, chunk: PcmChunk) -> Result<Vec<EncodedPacket>>;

    /// Zero-pad and encode any partial frame, then flush the native encoder.
    async fn flush(&mut self) -> Result<Vec<EncodedPacket>>;

    async fn close(&mut self) -> Result<()>;
}
