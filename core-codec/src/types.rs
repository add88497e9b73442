//! # Codec Types
//!
//! Value types shared by the codec sessions, the command protocol and the
//! adapters.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::format::FormatDescriptor;

/// Sample rates accepted by the baseline variant.
const AC3_SAMPLE_RATES: &[u32] = &[48_000, 44_100, 32_000];

/// Sample rates accepted by the enhanced variant.
const EAC3_SAMPLE_RATES: &[u32] = &[48_000, 44_100, 32_000, 24_000, 22_050, 16_000];

/// The codec family handled by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecVariant {
    /// Baseline Dolby Digital.
    Ac3,
    /// Enhanced AC-3 (Dolby Digital Plus).
    Eac3,
}

impl CodecVariant {
    /// Wire name used by the command protocol.
    pub fn as_str(self) -> &'static str {
        match self {
            CodecVariant::Ac3 => "ac3",
            CodecVariant::Eac3 => "eac3",
        }
    }

    /// Codec string a muxer expects in its decoder configuration.
    pub fn codec_string(self) -> &'static str {
        match self {
            CodecVariant::Ac3 => "ac-3",
            CodecVariant::Eac3 => "ec-3",
        }
    }

    /// Identifier the native engine uses for this variant.
    pub fn native_id(self) -> u8 {
        match self {
            CodecVariant::Ac3 => 0,
            CodecVariant::Eac3 => 1,
        }
    }

    /// Inverse of [`CodecVariant::native_id`].
    pub fn from_native_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(CodecVariant::Ac3),
            1 => Some(CodecVariant::Eac3),
            _ => None,
        }
    }

    /// Sample rates an encoder of this variant accepts.
    pub fn supported_sample_rates(self) -> &'static [u32] {
        match self {
            CodecVariant::Ac3 => AC3_SAMPLE_RATES,
            CodecVariant::Eac3 => EAC3_SAMPLE_RATES,
        }
    }

    /// Parses a host codec string such as `"ac-3"`, `"ec-3"` or a wire name.
    pub fn parse(codec: &str) -> Option<Self> {
        match codec.trim().to_ascii_lowercase().as_str() {
            "ac3" | "ac-3" => Some(CodecVariant::Ac3),
            "eac3" | "ec-3" | "e-ac-3" => Some(CodecVariant::Eac3),
            _ => None,
        }
    }
}

impl fmt::Display for CodecVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a codec session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Decoder,
    Encoder,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Decoder => f.write_str("decoder"),
            SessionKind::Encoder => f.write_str("encoder"),
        }
    }
}

/// Parameters for opening a native encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderParams {
    pub channels: u32,
    pub sample_rate: u32,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
}

/// PCM produced by one decode call.
///
/// Planar data holds `channels` contiguous planes of
/// `sample_count * bytes_per_sample` bytes. Interleaved data is one region of
/// `sample_count * channels * bytes_per_sample` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub data: Bytes,
    pub format: FormatDescriptor,
    pub channels: u32,
    pub sample_rate: u32,
    /// Frames, not samples times channels.
    pub sample_count: usize,
    /// Presentation timestamp in samples.
    pub timestamp: i64,
}

impl DecodedAudio {
    /// Expected payload length implied by the descriptor and counts.
    pub fn expected_len(&self) -> usize {
        self.sample_count * self.channels as usize * self.format.bytes_per_sample
    }
}

/// One packet produced by an encode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedOutput {
    pub data: Bytes,
    /// Timestamp in samples as reported by the engine.
    pub pts: i64,
    /// Duration in samples as reported by the engine.
    pub duration: i64,
}

/// Decoder configuration a muxer needs to describe an encoded stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecDescription {
    pub codec: String,
    pub number_of_channels: u32,
    pub sample_rate: u32,
}

impl CodecDescription {
    pub fn new(variant: CodecVariant, channels: u32, sample_rate: u32) -> Self {
        Self {
            codec: variant.codec_string().to_string(),
            number_of_channels: channels,
            sample_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_wire_names() {
        assert_eq!(serde_json::to_string(&CodecVariant::Ac3).unwrap(), "\"ac3\"");
        assert_eq!(serde_json::to_string(&CodecVariant::Eac3).unwrap(), "\"eac3\"");
        assert_eq!(
            serde_json::from_str::<CodecVariant>("\"eac3\"").unwrap(),
            CodecVariant::Eac3
        );
    }

    #[test]
    fn test_variant_parse_accepts_host_strings() {
        assert_eq!(CodecVariant::parse("ac-3"), Some(CodecVariant::Ac3));
        assert_eq!(CodecVariant::parse("EC-3"), Some(CodecVariant::Eac3));
        assert_eq!(CodecVariant::parse("opus"), None);
    }

    #[test]
    fn test_native_ids() {
        for variant in [CodecVariant::Ac3, CodecVariant::Eac3] {
            assert_eq!(CodecVariant::from_native_id(variant.native_id()), Some(variant));
        }
        assert_eq!(CodecVariant::from_native_id(7), None);
    }

    #[test]
    fn test_enhanced_rates_extend_baseline() {
        for rate in CodecVariant::Ac3.supported_sample_rates() {
            assert!(CodecVariant::Eac3.supported_sample_rates().contains(rate));
        }
        assert!(!CodecVariant::Ac3.supported_sample_rates().contains(&22_050));
    }

    #[test]
    fn test_codec_description_shape() {
        let description = CodecDescription::new(CodecVariant::Eac3, 6, 48_000);
        let json = serde_json::to_value(&description).unwrap();
        assert_eq!(json["codec"], "ec-3");
        assert_eq!(json["numberOfChannels"], 6);
        assert_eq!(json["sampleRate"], 48_000);
    }
}
