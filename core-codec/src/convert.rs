//! # Sample Format Converter
//!
//! Normalizes decoded PCM into interleaved `f32` and converts between
//! wall-clock durations and sample counts.

use std::time::Duration;

use crate::error::{CodecError, Result};
use crate::format::SampleFormat;
use crate::types::DecodedAudio;

/// Sample converter that normalizes audio to f32 interleaved format.
///
/// Decoders may emit any tag from the format table in either layout. This
/// converter flattens everything to interleaved f32 samples in the range
/// [-1.0, 1.0].
pub struct SampleConverter;

impl SampleConverter {
    /// Convert a decoded buffer to interleaved f32 samples.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedOutput`] if the payload length does not
    /// match the buffer's description.
    pub fn to_interleaved_f32(audio: &DecodedAudio) -> Result<Vec<f32>> {
        if audio.data.len() != audio.expected_len() {
            return Err(CodecError::MalformedOutput(format!(
                "buffer holds {} bytes, description implies {}",
                audio.data.len(),
                audio.expected_len()
            )));
        }

        let format = audio.format.format;
        let width = audio.format.bytes_per_sample;
        let decoded: Vec<f32> = audio
            .data
            .chunks_exact(width)
            .map(|raw| Self::read_sample(format, raw))
            .collect();

        if audio.format.planar {
            Ok(Self::interleave(
                &decoded,
                audio.channels as usize,
                audio.sample_count,
            ))
        } else {
            Ok(decoded)
        }
    }

    fn read_sample(format: SampleFormat, raw: &[u8]) -> f32 {
        match format {
            SampleFormat::U8 | SampleFormat::U8Planar => (raw[0] as f32 - 128.0) / 128.0,
            SampleFormat::S16 | SampleFormat::S16Planar => {
                i16::from_le_bytes([raw[0], raw[1]]) as f32 / 32768.0
            }
            SampleFormat::S32 | SampleFormat::S32Planar => {
                (i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64 / 2_147_483_648.0)
                    as f32
            }
            SampleFormat::F32 | SampleFormat::F32Planar => {
                f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
            }
        }
    }

    /// Planar (LLLL...RRRR...) to interleaved (LRLR...).
    fn interleave(planar: &[f32], channels: usize, frames: usize) -> Vec<f32> {
        let mut interleaved = Vec::with_capacity(planar.len());
        for frame in 0..frames {
            for channel in 0..channels {
                interleaved.push(planar[channel * frames + frame]);
            }
        }
        interleaved
    }

    /// Converts a duration to a sample count, rounding to the nearest sample.
    pub fn seconds_to_samples(duration: Duration, sample_rate: u32) -> i64 {
        (duration.as_secs_f64() * sample_rate as f64).round() as i64
    }

    /// Converts a sample count back to a duration. Negative counts clamp to zero.
    pub fn samples_to_duration(samples: i64, sample_rate: u32) -> Duration {
        if sample_rate == 0 || samples <= 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(samples as f64 / sample_rate as f64)
    }
}
