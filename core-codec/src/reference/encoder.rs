use std::collections::VecDeque;

use bytes::Bytes;

use super::packet::{write_packet, PacketHeader};
use super::FRAME_SIZE;
use crate::engine::{NativeEncoder, NativeError, NativePacket};
use crate::types::{CodecVariant, EncoderParams};

/// Encoder context of the reference engine.
///
/// Every call to `encode` yields exactly one packet of `FRAME_SIZE` frames.
pub struct ReferenceEncoder {
    header: PacketHeader,
    input: Vec<f32>,
    ready: VecDeque<NativePacket>,
}

impl ReferenceEncoder {
    pub(super) fn new(variant: CodecVariant, params: &EncoderParams) -> Self {
        Self {
            header: PacketHeader {
                variant,
                channels: params.channels as u8,
                sample_rate: params.sample_rate,
                frames: FRAME_SIZE as u16,
            },
            input: Vec::new(),
            ready: VecDeque::new(),
        }
    }

    fn samples_per_frame(&self) -> usize {
        FRAME_SIZE * self.header.channels as usize
    }
}

impl NativeEncoder for ReferenceEncoder {
    fn frame_size(&self) -> usize {
        FRAME_SIZE
    }

    fn input_buffer(&mut self, samples: usize) -> Result<&mut [f32], NativeError> {
        if samples != self.samples_per_frame() {
            return Err(NativeError::EINVAL);
        }
        self.input.clear();
        self.input.resize(samples, 0.0);
        Ok(&mut self.input[..])
    }

    fn encode(&mut self, pts: i64) -> Result<usize, NativeError> {
        if self.input.len() != self.samples_per_frame() {
            return Err(NativeError::EINVAL);
        }

        let data = write_packet(self.header, &self.input);
        self.input.clear();
        self.ready.push_back(NativePacket {
            data: Bytes::from(data),
            pts,
            duration: FRAME_SIZE as i64,
        });

        Ok(self.ready.len())
    }

    fn packet(&mut self) -> Option<NativePacket> {
        self.ready.pop_front()
    }

    fn flush(&mut self) {
        // Packets are emitted eagerly, so there is nothing buffered to drain.
        self.input.clear();
    }
}
