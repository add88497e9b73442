//! # Codec Sessions
//!
//! Owned wrappers around one native decoding or encoding context.
//!
//! A session only exists once the engine has allocated its context, so there
//! is no "uninitialized" state to guard against. Processing errors are
//! returned to the caller and never poison the session; retrying is a caller
//! decision. Closing consumes the session and drops the native context.

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, trace};

use crate::engine::{CodecEngine, NativeDecoder, NativeEncoder, NativeError, NativeFrameInfo};
use crate::error::{CodecError, Result};
use crate::format::{self, FormatDescriptor};
use crate::types::{CodecVariant, DecodedAudio, EncodedOutput, EncoderParams};

/// A native decoding context.
pub struct DecoderSession {
    variant: CodecVariant,
    native: Box<dyn NativeDecoder>,
}

impl DecoderSession {
    /// Allocates a decoding context for `variant`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InitFailed`] with the native code if the engine
    /// cannot allocate the context.
    pub fn open(engine: &dyn CodecEngine, variant: CodecVariant) -> Result<Self> {
        let native = engine.open_decoder(variant).map_err(|e| CodecError::InitFailed {
            codec: variant,
            code: e.code(),
        })?;

        info!(codec = %variant, "Decoder session opened");
        Ok(Self { variant, native })
    }

    pub fn variant(&self) -> CodecVariant {
        self.variant
    }

    /// Decodes one compressed packet.
    ///
    /// The samples are copied out of native memory into a buffer the caller
    /// owns, since the next decode call reuses the native buffers.
    pub fn decode_packet(&mut self, data: &[u8], timestamp: i64) -> Result<DecodedAudio> {
        let staging = self
            .native
            .packet_buffer(data.len())
            .map_err(|e| CodecError::BufferAllocation { code: e.code() })?;
        if staging.len() != data.len() {
            return Err(CodecError::MalformedOutput(format!(
                "staging buffer holds {} bytes, packet has {}",
                staging.len(),
                data.len()
            )));
        }
        staging.copy_from_slice(data);

        self.native
            .decode(timestamp)
            .map_err(|e| CodecError::DecodeFailed { code: e.code() })?;

        let info = self.native.frame_info();
        let descriptor =
            format::lookup(info.format).ok_or(CodecError::UnsupportedFormat(info.format))?;
        let pcm = self.copy_samples(&info, &descriptor)?;

        trace!(
            bytes = data.len(),
            frames = info.sample_count,
            pts = info.pts,
            "Decoded packet"
        );

        Ok(DecodedAudio {
            data: pcm,
            format: descriptor,
            channels: info.channels,
            sample_rate: info.sample_rate,
            sample_count: info.sample_count,
            timestamp: info.pts,
        })
    }

    fn copy_samples(&self, info: &NativeFrameInfo, descriptor: &FormatDescriptor) -> Result<Bytes> {
        let channels = info.channels as usize;

        if descriptor.planar {
            let plane_len = info.sample_count * descriptor.bytes_per_sample;
            let mut out = BytesMut::with_capacity(plane_len * channels);
            for index in 0..channels {
                let plane = self.read_plane(index, plane_len)?;
                out.extend_from_slice(plane);
            }
            Ok(out.freeze())
        } else {
            let len = info.sample_count * channels * descriptor.bytes_per_sample;
            Ok(Bytes::copy_from_slice(self.read_plane(0, len)?))
        }
    }

    fn read_plane(&self, index: usize, len: usize) -> Result<&[u8]> {
        let plane = self
            .native
            .plane(index)
            .ok_or_else(|| CodecError::MalformedOutput(format!("missing plane {}", index)))?;
        plane.get(..len).ok_or_else(|| {
            CodecError::MalformedOutput(format!(
                "plane {} holds {} bytes, expected {}",
                index,
                plane.len(),
                len
            ))
        })
    }

    /// Releases buffered reference state at end of stream.
    pub fn flush(&mut self) {
        self.native.flush();
        debug!(codec = %self.variant, "Decoder session flushed");
    }

    /// Releases the native context.
    pub fn close(self) {
        info!(codec = %self.variant, "Decoder session closed");
    }
}

/// A native encoding context.
pub struct EncoderSession {
    variant: CodecVariant,
    params: EncoderParams,
    frame_size: usize,
    native: Box<dyn NativeEncoder>,
}

impl EncoderSession {
    /// Allocates an encoding context and reads back its frame size.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InitFailed`] if the engine rejects the
    /// parameters or reports a zero frame size.
    pub fn open(
        engine: &dyn CodecEngine,
        variant: CodecVariant,
        channels: u32,
        sample_rate: u32,
        bitrate: u32,
    ) -> Result<Self> {
        let params = EncoderParams {
            channels,
            sample_rate,
            bitrate,
        };
        let native = engine
            .open_encoder(variant, &params)
            .map_err(|e| CodecError::InitFailed {
                codec: variant,
                code: e.code(),
            })?;

        let frame_size = native.frame_size();
        if frame_size == 0 {
            return Err(CodecError::InitFailed {
                codec: variant,
                code: NativeError::EINVAL.code(),
            });
        }

        info!(
            codec = %variant,
            channels,
            sample_rate,
            bitrate,
            frame_size,
            "Encoder session opened"
        );
        Ok(Self {
            variant,
            params,
            frame_size,
            native,
        })
    }

    pub fn variant(&self) -> CodecVariant {
        self.variant
    }

    pub fn params(&self) -> EncoderParams {
        self.params
    }

    /// Frames consumed per encode call.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn channels(&self) -> u32 {
        self.params.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }

    /// Encodes exactly one frame of interleaved samples.
    ///
    /// # Errors
    ///
    /// - [`CodecError::FrameSizeMismatch`] if `samples` is not exactly
    ///   `frame_size * channels` long
    /// - [`CodecError::EncodeFailed`] if the native step fails
    /// - [`CodecError::PacketCountMismatch`] if the engine yields other than
    ///   one packet
    pub fn encode_frame(&mut self, samples: &[f32], timestamp: i64) -> Result<EncodedOutput> {
        let expected = self.frame_size * self.params.channels as usize;
        if samples.len() != expected {
            return Err(CodecError::FrameSizeMismatch {
                expected,
                actual: samples.len(),
            });
        }

        let input = self
            .native
            .input_buffer(expected)
            .map_err(|e| CodecError::BufferAllocation { code: e.code() })?;
        if input.len() != expected {
            return Err(CodecError::MalformedOutput(format!(
                "input buffer holds {} samples, frame has {}",
                input.len(),
                expected
            )));
        }
        input.copy_from_slice(samples);

        let ready = self
            .native
            .encode(timestamp)
            .map_err(|e| CodecError::EncodeFailed { code: e.code() })?;
        if ready != 1 {
            self.discard_packets();
            return Err(CodecError::PacketCountMismatch { produced: ready });
        }

        let packet = self
            .native
            .packet()
            .ok_or(CodecError::PacketCountMismatch { produced: 0 })?;

        trace!(
            bytes = packet.data.len(),
            pts = packet.pts,
            duration = packet.duration,
            "Encoded frame"
        );

        Ok(EncodedOutput {
            data: packet.data,
            pts: packet.pts,
            duration: packet.duration,
        })
    }

    /// Drains the engine at end of stream, discarding buffered packets.
    pub fn flush(&mut self) {
        self.native.flush();
        let discarded = self.discard_packets();
        debug!(codec = %self.variant, discarded, "Encoder session flushed");
    }

    fn discard_packets(&mut self) -> usize {
        let mut discarded = 0;
        while self.native.packet().is_some() {
            discarded += 1;
        }
        discarded
    }

    /// Releases the native context.
    pub fn close(self) {
        info!(codec = %self.variant, "Encoder session closed");
    }
}
