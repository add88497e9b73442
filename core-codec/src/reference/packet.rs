//! Bitstream of the reference engine.
//!
//! Layout of one packet:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 2 | sync word `0x0B77`, big endian |
//! | 2 | 1 | variant id |
//! | 3 | 1 | channel count |
//! | 4 | 4 | sample rate, little endian |
//! | 8 | 2 | frames in packet, little endian |
//! | 10 | 2 | Fletcher-16 of the payload, little endian |
//! | 12 | .. | interleaved 16-bit PCM, little endian |

use crate::engine::NativeError;
use crate::types::CodecVariant;

pub const SYNC_WORD: u16 = 0x0B77;
pub const HEADER_LEN: usize = 12;

const QUANT_SCALE: f32 = 32767.0;

/// Parsed packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub variant: CodecVariant,
    pub channels: u8,
    pub sample_rate: u32,
    pub frames: u16,
}

impl PacketHeader {
    fn payload_len(&self) -> usize {
        self.frames as usize * self.channels as usize * 2
    }
}

/// Fletcher-16 checksum.
pub fn fletcher16(data: &[u8]) -> u16 {
    let (mut sum1, mut sum2) = (0u16, 0u16);
    for byte in data {
        sum1 = (sum1 + *byte as u16) % 255;
        sum2 = (sum2 + sum1) % 255;
    }
    (sum2 << 8) | sum1
}

/// Quantises one frame of interleaved samples into a packet.
pub fn write_packet(header: PacketHeader, samples: &[f32]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        let quantised = (sample.clamp(-1.0, 1.0) * QUANT_SCALE).round() as i16;
        payload.extend_from_slice(&quantised.to_le_bytes());
    }

    let mut packet = Vec::with_capacity(HEADER_LEN + payload.len());
    packet.extend_from_slice(&SYNC_WORD.to_be_bytes());
    packet.push(header.variant.native_id());
    packet.push(header.channels);
    packet.extend_from_slice(&header.sample_rate.to_le_bytes());
    packet.extend_from_slice(&header.frames.to_le_bytes());
    packet.extend_from_slice(&fletcher16(&payload).to_le_bytes());
    packet.extend_from_slice(&payload);
    packet
}

/// Validates a packet and reconstructs its interleaved samples.
///
/// Any structural problem is reported as [`NativeError::INVALID_DATA`].
pub fn read_packet(data: &[u8]) -> Result<(PacketHeader, Vec<f32>), NativeError> {
    if data.len() < HEADER_LEN {
        return Err(NativeError::INVALID_DATA);
    }

    if u16::from_be_bytes([data[0], data[1]]) != SYNC_WORD {
        return Err(NativeError::INVALID_DATA);
    }

    let variant = CodecVariant::from_native_id(data[2]).ok_or(NativeError::INVALID_DATA)?;
    let header = PacketHeader {
        variant,
        channels: data[3],
        sample_rate: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
        frames: u16::from_le_bytes([data[8], data[9]]),
    };
    if header.channels == 0 || header.sample_rate == 0 {
        return Err(NativeError::INVALID_DATA);
    }

    let payload = &data[HEADER_LEN..];
    if payload.len() != header.payload_len() {
        return Err(NativeError::INVALID_DATA);
    }

    let checksum = u16::from_le_bytes([data[10], data[11]]);
    if fletcher16(payload) != checksum {
        return Err(NativeError::INVALID_DATA);
    }

    let samples = payload
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / QUANT_SCALE)
        .collect();

    Ok((header, samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(frames: u16) -> PacketHeader {
        PacketHeader {
            variant: CodecVariant::Ac3,
            channels: 2,
            sample_rate: 48_000,
            frames,
        }
    }

    #[test]
    fn test_fletcher16_known_vector() {
        assert_eq!(fletcher16(b"abcde"), 0xC8F0);
        assert_eq!(fletcher16(&[]), 0);
    }

    #[test]
    fn test_packet_reconstructs_samples() {
        let samples = [0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
        let packet = write_packet(header(3), &samples);
        assert_eq!(packet.len(), HEADER_LEN + samples.len() * 2);

        let (parsed, decoded) = read_packet(&packet).unwrap();
        assert_eq!(parsed, header(3));
        for (a, b) in samples.iter().zip(decoded.iter()) {
            assert!((a - b).abs() <= 1.0 / 32768.0, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        let packet = write_packet(header(1), &[2.0, -3.0]);
        let (_, decoded) = read_packet(&packet).unwrap();
        assert_eq!(decoded, vec![1.0, -1.0]);
    }

    #[test]
    fn test_bad_sync_rejected() {
        let mut packet = write_packet(header(1), &[0.1, 0.2]);
        packet[0] = 0xFF;
        assert_eq!(read_packet(&packet), Err(NativeError::INVALID_DATA));
    }

    #[test]
    fn test_truncation_rejected() {
        let packet = write_packet(header(4), &[0.1; 8]);
        assert_eq!(
            read_packet(&packet[..packet.len() - 1]),
            Err(NativeError::INVALID_DATA)
        );
        assert_eq!(read_packet(&packet[..5]), Err(NativeError::INVALID_DATA));
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let mut packet = write_packet(header(2), &[0.1, 0.2, 0.3, 0.4]);
        let last = packet.len() - 1;
        packet[last] ^= 0x55;
        assert_eq!(read_packet(&packet), Err(NativeError::INVALID_DATA));
    }
}
