//! # Reference Engine
//!
//! A deterministic software engine that honours the native engine contract
//! without a system codec library. Packets carry 16-bit PCM behind an AC-3
//! style sync word and a checksum, so encode followed by decode reconstructs
//! the input to within one quantisation step.
//!
//! The decoder emits planar 32-bit float by default. Hosts and tests can pick
//! any native format id with [`ReferenceEngine::with_decoder_output_format`],
//! including ids the format table does not know.

mod decoder;
mod encoder;
pub mod packet;

pub use decoder::ReferenceDecoder;
pub use encoder::ReferenceEncoder;

use tracing::{debug, info};

use crate::engine::{CodecEngine, NativeDecoder, NativeEncoder, NativeError};
use crate::format::native;
use crate::types::{CodecVariant, EncoderParams};

/// Frames per encoded packet for both variants.
pub const FRAME_SIZE: usize = 1536;

const AC3_MAX_CHANNELS: u32 = 6;
const EAC3_MAX_CHANNELS: u32 = 8;
const MIN_BITRATE: u32 = 32_000;
const AC3_MAX_BITRATE: u32 = 640_000;
const EAC3_MAX_BITRATE: u32 = 6_144_000;

/// Software engine for both codec variants.
#[derive(Debug, Clone)]
pub struct ReferenceEngine {
    decoder_output_format: i32,
    loaded: bool,
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceEngine {
    pub fn new() -> Self {
        Self {
            decoder_output_format: native::F32_PLANAR,
            loaded: false,
        }
    }

    /// Makes decoders report `format_id` as their output sample format.
    pub fn with_decoder_output_format(mut self, format_id: i32) -> Self {
        self.decoder_output_format = format_id;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn check_params(variant: CodecVariant, params: &EncoderParams) -> Result<(), NativeError> {
        let (max_channels, max_bitrate) = match variant {
            CodecVariant::Ac3 => (AC3_MAX_CHANNELS, AC3_MAX_BITRATE),
            CodecVariant::Eac3 => (EAC3_MAX_CHANNELS, EAC3_MAX_BITRATE),
        };

        if params.channels == 0 || params.channels > max_channels {
            return Err(NativeError::EINVAL);
        }
        if !variant.supported_sample_rates().contains(&params.sample_rate) {
            return Err(NativeError::EINVAL);
        }
        if params.bitrate < MIN_BITRATE || params.bitrate > max_bitrate {
            return Err(NativeError::EINVAL);
        }
        Ok(())
    }
}

impl CodecEngine for ReferenceEngine {
    fn load(&mut self) -> Result<(), NativeError> {
        if !self.loaded {
            info!("Reference codec engine loaded");
            self.loaded = true;
        }
        Ok(())
    }

    fn open_decoder(&self, variant: CodecVariant) -> Result<Box<dyn NativeDecoder>, NativeError> {
        debug!(%variant, format = self.decoder_output_format, "Opening reference decoder");
        Ok(Box::new(ReferenceDecoder::new(
            variant,
            self.decoder_output_format,
        )))
    }

    fn open_encoder(
        &self,
        variant: CodecVariant,
        params: &EncoderParams,
    ) -> Result<Box<dyn NativeEncoder>, NativeError> {
        Self::check_params(variant, params)?;
        debug!(
            %variant,
            channels = params.channels,
            sample_rate = params.sample_rate,
            bitrate = params.bitrate,
            "Opening reference encoder"
        );
        Ok(Box::new(ReferenceEncoder::new(variant, params)))
    }
}
