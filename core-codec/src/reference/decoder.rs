use tracing::trace;

use super::packet::read_packet;
use crate::engine::{NativeDecoder, NativeError, NativeFrameInfo};
use crate::format::{self, native};
use crate::types::CodecVariant;

/// Decoder context of the reference engine.
pub struct ReferenceDecoder {
    variant: CodecVariant,
    output_format: i32,
    staging: Vec<u8>,
    planes: Vec<Vec<u8>>,
    info: NativeFrameInfo,
}

impl ReferenceDecoder {
    pub(super) fn new(variant: CodecVariant, output_format: i32) -> Self {
        Self {
            variant,
            output_format,
            staging: Vec::new(),
            planes: Vec::new(),
            info: NativeFrameInfo::default(),
        }
    }

    /// Renders interleaved samples into the configured output layout.
    fn render(&mut self, samples: &[f32], channels: usize) {
        let (bytes_per_sample, planar) = output_layout(self.output_format);
        let frames = samples.len() / channels;

        self.planes.clear();
        if planar {
            for channel in 0..channels {
                let mut plane = Vec::with_capacity(frames * bytes_per_sample);
                for frame in 0..frames {
                    write_sample(
                        &mut plane,
                        self.output_format,
                        samples[frame * channels + channel],
                    );
                }
                self.planes.push(plane);
            }
        } else {
            let mut plane = Vec::with_capacity(samples.len() * bytes_per_sample);
            for sample in samples {
                write_sample(&mut plane, self.output_format, *sample);
            }
            self.planes.push(plane);
        }
    }
}

impl NativeDecoder for ReferenceDecoder {
    fn packet_buffer(&mut self, size: usize) -> Result<&mut [u8], NativeError> {
        if size == 0 {
            return Err(NativeError::EINVAL);
        }
        self.staging.clear();
        self.staging.resize(size, 0);
        Ok(&mut self.staging[..])
    }

    fn decode(&mut self, pts: i64) -> Result<(), NativeError> {
        let (header, samples) = read_packet(&self.staging)?;

        // The enhanced decoder also accepts baseline streams.
        if header.variant == CodecVariant::Eac3 && self.variant == CodecVariant::Ac3 {
            return Err(NativeError::INVALID_DATA);
        }

        let channels = header.channels as usize;
        self.render(&samples, channels);
        self.info = NativeFrameInfo {
            format: self.output_format,
            channels: header.channels as u32,
            sample_rate: header.sample_rate,
            sample_count: header.frames as usize,
            pts,
        };

        trace!(frames = header.frames, pts, "Reference decoder produced frame");
        Ok(())
    }

    fn frame_info(&self) -> NativeFrameInfo {
        self.info
    }

    fn plane(&self, index: usize) -> Option<&[u8]> {
        self.planes.get(index).map(Vec::as_slice)
    }

    fn flush(&mut self) {
        self.staging.clear();
    }
}

/// Bytes per sample and planarity for any native id, including those without
/// a portable tag.
fn output_layout(format_id: i32) -> (usize, bool) {
    if let Some(descriptor) = format::lookup(format_id) {
        return (descriptor.bytes_per_sample, descriptor.planar);
    }
    match format_id {
        native::F64 | native::S64 => (8, false),
        native::F64_PLANAR | native::S64_PLANAR => (8, true),
        _ => (4, true),
    }
}

fn write_sample(out: &mut Vec<u8>, format_id: i32, sample: f32) {
    match format_id {
        native::U8 | native::U8_PLANAR => {
            out.push((sample * 128.0 + 128.0).round().clamp(0.0, 255.0) as u8);
        }
        native::S16 | native::S16_PLANAR => {
            let value = (sample * 32767.0).round() as i16;
            out.extend_from_slice(&value.to_le_bytes());
        }
        native::S32 | native::S32_PLANAR => {
            let value = (sample as f64 * 2_147_483_647.0).round() as i32;
            out.extend_from_slice(&value.to_le_bytes());
        }
        native::F64 | native::F64_PLANAR => {
            out.extend_from_slice(&(sample as f64).to_le_bytes());
        }
        native::S64 | native::S64_PLANAR => {
            let value = (sample as f64 * 9_223_372_036_854_775_807.0) as i64;
            out.extend_from_slice(&value.to_le_bytes());
        }
        _ => out.extend_from_slice(&sample.to_le_bytes()),
    }
}
