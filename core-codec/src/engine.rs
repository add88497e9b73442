//! # Native Engine Contract
//!
//! Traits a native codec engine implements so that codec sessions can drive
//! it. The shape follows a C bridge over a codec library: the caller fills a
//! native-owned staging buffer, invokes a process step, then reads results
//! back out of native-owned memory that the next call invalidates.
//!
//! Closing a native context is modelled by dropping the boxed object.

use std::fmt;

use bytes::Bytes;

use crate::types::{CodecVariant, EncoderParams};

/// Native return code.
///
/// Well-known values follow the FFmpeg convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeError(pub i32);

impl NativeError {
    /// Invalid data found when processing input.
    pub const INVALID_DATA: NativeError = NativeError(-1_094_995_529);
    /// Invalid argument.
    pub const EINVAL: NativeError = NativeError(-22);
    /// Out of memory.
    pub const ENOMEM: NativeError = NativeError(-12);
    /// Resource temporarily unavailable.
    pub const EAGAIN: NativeError = NativeError(-11);
    /// End of file.
    pub const EOF: NativeError = NativeError(-541_478_725);

    pub fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NativeError::INVALID_DATA => write!(f, "invalid data ({})", self.0),
            NativeError::EINVAL => write!(f, "invalid argument ({})", self.0),
            NativeError::ENOMEM => write!(f, "out of memory ({})", self.0),
            NativeError::EAGAIN => write!(f, "try again ({})", self.0),
            NativeError::EOF => write!(f, "end of file ({})", self.0),
            NativeError(code) => write!(f, "native error {}", code),
        }
    }
}

impl std::error::Error for NativeError {}

/// Description of the most recently decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeFrameInfo {
    /// Native sample-format identifier.
    pub format: i32,
    pub channels: u32,
    pub sample_rate: u32,
    /// Frames in the decoded output.
    pub sample_count: usize,
    /// Timestamp echoed from the decode call.
    pub pts: i64,
}

/// One packet pulled from a native encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativePacket {
    pub data: Bytes,
    pub pts: i64,
    pub duration: i64,
}

/// A loadable codec engine that hands out native contexts.
pub trait CodecEngine: Send + 'static {
    /// One-time module load. Called before the first context is opened.
    fn load(&mut self) -> Result<(), NativeError>;

    /// Allocates a decoding context.
    fn open_decoder(&self, variant: CodecVariant) -> Result<Box<dyn NativeDecoder>, NativeError>;

    /// Allocates an encoding context.
    fn open_encoder(
        &self,
        variant: CodecVariant,
        params: &EncoderParams,
    ) -> Result<Box<dyn NativeEncoder>, NativeError>;
}

/// A native decoding context.
pub trait NativeDecoder: Send {
    /// Returns a staging buffer of exactly `size` bytes for the next packet.
    fn packet_buffer(&mut self, size: usize) -> Result<&mut [u8], NativeError>;

    /// Decodes the staged packet.
    fn decode(&mut self, pts: i64) -> Result<(), NativeError>;

    /// Describes the output of the last successful decode.
    fn frame_info(&self) -> NativeFrameInfo;

    /// Output plane `index` of the last decode.
    ///
    /// Interleaved formats expose a single plane.
    fn plane(&self, index: usize) -> Option<&[u8]>;

    /// Releases internally buffered reference state.
    fn flush(&mut self);
}

/// A native encoding context.
pub trait NativeEncoder: Send {
    /// Frames the encoder consumes per call.
    fn frame_size(&self) -> usize;

    /// Returns an input buffer for `samples` interleaved floats.
    fn input_buffer(&mut self, samples: usize) -> Result<&mut [f32], NativeError>;

    /// Encodes the staged input and returns how many packets are ready.
    fn encode(&mut self, pts: i64) -> Result<usize, NativeError>;

    /// Pops the next ready packet.
    fn packet(&mut self) -> Option<NativePacket>;

    /// Signals end of stream so buffered packets become available.
    fn flush(&mut self);
}
