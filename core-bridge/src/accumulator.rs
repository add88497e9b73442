//! # Frame Accumulator
//!
//! Re-chunks caller PCM of any length into the encoder's fixed frame size.
//!
//! ## Overview
//!
//! Input arrives as interleaved `f32` chunks of arbitrary length. The
//! accumulator appends them to one growable store and releases complete
//! frames of exactly `frame_size` sample-frames, oldest first.
//!
//! Two timestamps are tracked, both in samples:
//! - the *sample* timestamp follows input position and advances by
//!   `frame_size` per released frame
//! - the *packet* timestamp follows output duration and advances by each
//!   packet's reported duration
//!
//! They only agree while the engine reports `duration == frame_size`. A
//! divergence is handled according to the configured [`DurationPolicy`].
//!
//! ## Usage
//!
//! ```
//! use core_bridge::accumulator::FrameAccumulator;
//! use core_runtime::DurationPolicy;
//!
//! let mut acc = FrameAccumulator::new(1, 4, 16, DurationPolicy::Strict).unwrap();
//! acc.push(&[0.1, 0.2, 0.3], 100).unwrap();
//! assert!(acc.next_frame().is_none());
//!
//! acc.push(&[0.4, 0.5], 103).unwrap();
//! let frame = acc.next_frame().unwrap();
//! assert_eq!(frame.samples, vec![0.1, 0.2, 0.3, 0.4]);
//! assert_eq!(frame.timestamp, 100);
//! assert_eq!(acc.pending_frames(), 1);
//! ```

use core_codec::EncodedOutput;
use core_runtime::DurationPolicy;
use tracing::warn;

use crate::adapter::EncodedPacket;
use crate::error::{BridgeError, Result};

/// One complete frame ready for the encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFrame {
    /// Exactly `frame_size * channels` interleaved samples.
    pub samples: Vec<f32>,
    /// Sample timestamp of the first frame.
    pub timestamp: i64,
}

/// Buffers PCM input into fixed-size encoder frames.
#[derive(Debug)]
pub struct FrameAccumulator {
    channels: usize,
    frame_size: usize,
    /// Zero-initialised store; its length is the capacity.
    buffer: Vec<f32>,
    pending_frames: usize,
    next_sample_timestamp: Option<i64>,
    next_packet_timestamp: Option<i64>,
    duration_policy: DurationPolicy,
}

impl FrameAccumulator {
    /// Creates an accumulator holding `initial_capacity` samples.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidInput`] if `channels` or `frame_size`
    /// is zero.
    pub fn new(
        channels: usize,
        frame_size: usize,
        initial_capacity: usize,
        duration_policy: DurationPolicy,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(BridgeError::InvalidInput(
                "channel count must be greater than 0".to_string(),
            ));
        }
        if frame_size == 0 {
            return Err(BridgeError::InvalidInput(
                "frame size must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            channels,
            frame_size,
            buffer: vec![0.0; initial_capacity.max(1)],
            pending_frames: 0,
            next_sample_timestamp: None,
            next_packet_timestamp: None,
            duration_policy,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Capacity of the store in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Buffered sample-frames not yet released.
    pub fn pending_frames(&self) -> usize {
        self.pending_frames
    }

    pub fn next_sample_timestamp(&self) -> Option<i64> {
        self.next_sample_timestamp
    }

    pub fn next_packet_timestamp(&self) -> Option<i64> {
        self.next_packet_timestamp
    }

    /// Appends interleaved samples starting at `timestamp`.
    ///
    /// The timestamp is only read on the first push after a reset; later
    /// pushes are assumed to be contiguous.
    pub fn push(&mut self, samples: &[f32], timestamp: i64) -> Result<()> {
        if samples.len() % self.channels != 0 {
            return Err(BridgeError::InvalidInput(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                self.channels
            )));
        }

        if self.next_sample_timestamp.is_none() {
            self.next_sample_timestamp = Some(timestamp);
            self.next_packet_timestamp = Some(timestamp);
        }

        let offset = self.pending_frames * self.channels;
        let end = offset + samples.len();
        self.ensure_capacity(end);

        self.buffer[offset..end].copy_from_slice(samples);
        self.pending_frames += samples.len() / self.channels;
        Ok(())
    }

    fn ensure_capacity(&mut self, required: usize) {
        let mut capacity = self.buffer.len();
        while capacity < required {
            capacity *= 2;
        }
        if capacity > self.buffer.len() {
            self.buffer.resize(capacity, 0.0);
        }
    }

    /// Releases the oldest complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Option<PendingFrame> {
        if self.pending_frames < self.frame_size {
            return None;
        }

        let frame_len = self.frame_size * self.channels;
        let buffered_len = self.pending_frames * self.channels;
        let samples = self.buffer[..frame_len].to_vec();
        self.buffer.copy_within(frame_len..buffered_len, 0);
        self.pending_frames -= self.frame_size;

        let timestamp = self.next_sample_timestamp.unwrap_or(0);
        self.next_sample_timestamp = Some(timestamp + self.frame_size as i64);

        Some(PendingFrame { samples, timestamp })
    }

    /// Zero-fills a trailing partial frame up to `frame_size`.
    ///
    /// Returns `false` when nothing needed padding.
    pub fn pad_final_frame(&mut self) -> bool {
        let remainder = self.pending_frames % self.frame_size;
        if remainder == 0 {
            return false;
        }

        let padded_frames = self.pending_frames + (self.frame_size - remainder);
        let start = self.pending_frames * self.channels;
        let end = padded_frames * self.channels;
        self.ensure_capacity(end);
        self.buffer[start..end].fill(0.0);
        self.pending_frames = padded_frames;
        true
    }

    /// Stamps an encoder output with the running packet timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DurationMismatch`] under
    /// [`DurationPolicy::Strict`] when the reported duration differs from the
    /// frame size. The timestamps are left untouched in that case.
    pub fn complete_packet(&mut self, output: EncodedOutput) -> Result<EncodedPacket> {
        let expected = self.frame_size as i64;
        if output.duration != expected {
            match self.duration_policy {
                DurationPolicy::Strict => {
                    return Err(BridgeError::DurationMismatch {
                        expected,
                        reported: output.duration,
                    });
                }
                DurationPolicy::Warn => {
                    warn!(
                        expected,
                        reported = output.duration,
                        "Packet duration differs from frame size, timestamps will drift"
                    );
                }
            }
        }

        let timestamp = self.next_packet_timestamp.unwrap_or(output.pts);
        self.next_packet_timestamp = Some(timestamp + output.duration);

        Ok(EncodedPacket::encoded(
            output.data,
            timestamp,
            output.duration,
        ))
    }

    /// Clears buffered frames and timestamps, keeping capacity.
    pub fn reset(&mut self) {
        self.pending_frames = 0;
        self.next_sample_timestamp = None;
        self.next_packet_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn output(duration: i64) -> EncodedOutput {
        EncodedOutput {
            data: Bytes::from_static(b"pkt"),
            pts: 0,
            duration,
        }
    }

    fn ramp(start: usize, len: usize) -> Vec<f32> {
        (start..start + len).map(|v| v as f32).collect()
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        assert!(FrameAccumulator::new(0, 4, 8, DurationPolicy::Strict).is_err());
        assert!(FrameAccumulator::new(2, 0, 8, DurationPolicy::Strict).is_err());
    }

    #[test]
    fn test_rejects_partial_frames_of_channels() {
        let mut acc = FrameAccumulator::new(2, 4, 8, DurationPolicy::Strict).unwrap();
        let result = acc.push(&[0.0; 3], 0);
        assert!(matches!(result, Err(BridgeError::InvalidInput(_))));
        assert_eq!(acc.pending_frames(), 0);
    }

    #[test]
    fn test_first_push_sets_timestamps() {
        let mut acc = FrameAccumulator::new(2, 4, 8, DurationPolicy::Strict).unwrap();
        acc.push(&[0.0; 2], 500).unwrap();
        acc.push(&[0.0; 2], 9999).unwrap();
        assert_eq!(acc.next_sample_timestamp(), Some(500));
        assert_eq!(acc.next_packet_timestamp(), Some(500));
        assert_eq!(acc.pending_frames(), 2);
    }

    #[test]
    fn test_frames_released_in_order_with_remainder_shifted() {
        let mut acc = FrameAccumulator::new(2, 3, 4, DurationPolicy::Strict).unwrap();
        acc.push(&ramp(0, 14), 10).unwrap();

        let first = acc.next_frame().unwrap();
        assert_eq!(first.samples, ramp(0, 6));
        assert_eq!(first.timestamp, 10);

        let second = acc.next_frame().unwrap();
        assert_eq!(second.samples, ramp(6, 6));
        assert_eq!(second.timestamp, 13);

        assert!(acc.next_frame().is_none());
        assert_eq!(acc.pending_frames(), 1);
        assert_eq!(acc.next_sample_timestamp(), Some(16));

        acc.push(&ramp(14, 4), 0).unwrap();
        let third = acc.next_frame().unwrap();
        assert_eq!(third.samples, ramp(12, 6));
        assert_eq!(third.timestamp, 16);
    }

    #[test]
    fn test_capacity_grows_by_doubling_only() {
        let mut acc = FrameAccumulator::new(1, 1024, 16, DurationPolicy::Strict).unwrap();
        acc.push(&[0.0; 10], 0).unwrap();
        assert_eq!(acc.capacity(), 16);

        acc.push(&[0.0; 60], 0).unwrap();
        assert_eq!(acc.capacity(), 128);

        acc.reset();
        assert_eq!(acc.capacity(), 128);
        acc.push(&[0.0; 4], 0).unwrap();
        assert_eq!(acc.capacity(), 128);
    }

    #[test]
    fn test_pad_final_frame_fills_silence() {
        let mut acc = FrameAccumulator::new(2, 4, 8, DurationPolicy::Strict).unwrap();
        // Dirty the store so padding must overwrite stale samples
        acc.push(&[9.0; 8], 0).unwrap();
        acc.next_frame().unwrap();

        acc.push(&[1.0, 1.0, 2.0, 2.0], 4).unwrap();
        assert!(acc.pad_final_frame());
        assert_eq!(acc.pending_frames(), 4);

        let frame = acc.next_frame().unwrap();
        assert_eq!(frame.samples, vec![1.0, 1.0, 2.0, 2.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(frame.timestamp, 4);
    }

    #[test]
    fn test_pad_with_nothing_pending() {
        let mut acc = FrameAccumulator::new(1, 4, 8, DurationPolicy::Strict).unwrap();
        assert!(!acc.pad_final_frame());
        acc.push(&[0.5; 4], 0).unwrap();
        acc.next_frame().unwrap();
        assert!(!acc.pad_final_frame());
    }

    #[test]
    fn test_packet_timestamps_follow_reported_duration() {
        let mut acc = FrameAccumulator::new(1, 4, 8, DurationPolicy::Strict).unwrap();
        acc.push(&[0.0; 8], 40).unwrap();

        let first = acc.complete_packet(output(4)).unwrap();
        let second = acc.complete_packet(output(4)).unwrap();
        assert_eq!(first.timestamp, 40);
        assert_eq!(second.timestamp, 44);
        assert_eq!(second.duration, Some(4));
        assert!(second.key_frame);
        assert_eq!(acc.next_packet_timestamp(), Some(48));
    }

    #[test]
    fn test_strict_policy_rejects_divergent_duration() {
        let mut acc = FrameAccumulator::new(1, 4, 8, DurationPolicy::Strict).unwrap();
        acc.push(&[0.0; 4], 0).unwrap();

        let err = acc.complete_packet(output(5)).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::DurationMismatch {
                expected: 4,
                reported: 5
            }
        ));
        assert_eq!(acc.next_packet_timestamp(), Some(0));
    }

    #[test]
    fn test_warn_policy_keeps_reported_duration() {
        let mut acc = FrameAccumulator::new(1, 4, 8, DurationPolicy::Warn).unwrap();
        acc.push(&[0.0; 4], 0).unwrap();

        let packet = acc.complete_packet(output(5)).unwrap();
        assert_eq!(packet.timestamp, 0);
        assert_eq!(acc.next_packet_timestamp(), Some(5));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut acc = FrameAccumulator::new(1, 4, 8, DurationPolicy::Strict).unwrap();
        acc.push(&[0.0; 3], 12).unwrap();
        acc.reset();

        assert_eq!(acc.pending_frames(), 0);
        assert_eq!(acc.next_sample_timestamp(), None);
        assert_eq!(acc.next_packet_timestamp(), None);

        acc.push(&[0.0; 1], 77).unwrap();
        assert_eq!(acc.next_sample_timestamp(), Some(77));
    }
}
