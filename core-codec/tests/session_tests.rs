//! Session tests against mocked and fake native engines
//!
//! This test suite verifies:
//! - Init failures surface the native code and never yield a session
//! - Decoded samples are copied plane by plane or as one region
//! - Unsupported formats and decode errors leave the session usable
//! - Packet-count violations are reported as integration errors

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use core_codec::format::native;
use core_codec::{
    CodecEngine, CodecError, CodecVariant, DecoderSession, EncoderParams, EncoderSession,
    NativeDecoder, NativeEncoder, NativeError, NativeFrameInfo, NativePacket, SampleFormat,
};
use mockall::mock;
use mockall::predicate::eq;

// ============================================================================
// Mock engine
// ============================================================================

mock! {
    pub Engine {}

    impl CodecEngine for Engine {
        fn load(&mut self) -> Result<(), NativeError>;
        fn open_decoder(
            &self,
            variant: CodecVariant,
        ) -> Result<Box<dyn NativeDecoder>, NativeError>;
        fn open_encoder(
            &self,
            variant: CodecVariant,
            params: &EncoderParams,
        ) -> Result<Box<dyn NativeEncoder>, NativeError>;
    }
}

// ============================================================================
// Fake native contexts
// ============================================================================

/// Decoder that reports a scripted sequence of formats and fills each plane
/// with its channel index.
struct FakeDecoder {
    formats: VecDeque<i32>,
    fallback_format: i32,
    channels: u32,
    frames: usize,
    plane_padding: isize,
    fail_with: Option<NativeError>,
    staged: Arc<Mutex<Vec<u8>>>,
    staging: Vec<u8>,
    info: NativeFrameInfo,
    planes: Vec<Vec<u8>>,
}

impl FakeDecoder {
    fn new(formats: &[i32], channels: u32, frames: usize) -> Self {
        Self {
            formats: formats.iter().copied().collect(),
            fallback_format: native::F32_PLANAR,
            channels,
            frames,
            plane_padding: 0,
            fail_with: None,
            staged: Arc::new(Mutex::new(Vec::new())),
            staging: Vec::new(),
            info: NativeFrameInfo::default(),
            planes: Vec::new(),
        }
    }

    fn with_plane_padding(mut self, padding: isize) -> Self {
        self.plane_padding = padding;
        self
    }

    fn failing(mut self, error: NativeError) -> Self {
        self.fail_with = Some(error);
        self
    }
}

impl NativeDecoder for FakeDecoder {
    fn packet_buffer(&mut self, size: usize) -> Result<&mut [u8], NativeError> {
        self.staging = vec![0; size];
        Ok(&mut self.staging[..])
    }

    fn decode(&mut self, pts: i64) -> Result<(), NativeError> {
        *self.staged.lock().unwrap() = self.staging.clone();
        if let Some(error) = self.fail_with.take() {
            return Err(error);
        }

        let format = self.formats.pop_front().unwrap_or(self.fallback_format);
        let (width, planar) = match core_codec::format::lookup(format) {
            Some(descriptor) => (descriptor.bytes_per_sample, descriptor.planar),
            None => (8, false),
        };

        self.planes.clear();
        let plane_count = if planar { self.channels as usize } else { 1 };
        let per_plane = if planar {
            self.frames * width
        } else {
            self.frames * width * self.channels as usize
        };
        let len = (per_plane as isize + self.plane_padding).max(0) as usize;
        for index in 0..plane_count {
            self.planes.push(vec![index as u8 + 1; len]);
        }

        self.info = NativeFrameInfo {
            format,
            channels: self.channels,
            sample_rate: 48_000,
            sample_count: self.frames,
            pts,
        };
        Ok(())
    }

    fn frame_info(&self) -> NativeFrameInfo {
        self.info
    }

    fn plane(&self, index: usize) -> Option<&[u8]> {
        self.planes.get(index).map(Vec::as_slice)
    }

    fn flush(&mut self) {}
}

/// Encoder that yields a scripted number of packets per call.
struct FakeEncoder {
    frame_size: usize,
    channels: usize,
    counts: VecDeque<usize>,
    input: Vec<f32>,
    ready: VecDeque<NativePacket>,
    buffered_on_flush: usize,
}

impl FakeEncoder {
    fn new(frame_size: usize, channels: usize, counts: &[usize]) -> Self {
        Self {
            frame_size,
            channels,
            counts: counts.iter().copied().collect(),
            input: Vec::new(),
            ready: VecDeque::new(),
            buffered_on_flush: 0,
        }
    }
}

impl NativeEncoder for FakeEncoder {
    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn input_buffer(&mut self, samples: usize) -> Result<&mut [f32], NativeError> {
        self.input = vec![0.0; samples];
        Ok(&mut self.input[..])
    }

    fn encode(&mut self, pts: i64) -> Result<usize, NativeError> {
        assert_eq!(self.input.len(), self.frame_size * self.channels);
        let count = self.counts.pop_front().unwrap_or(1);
        for i in 0..count {
            self.ready.push_back(NativePacket {
                data: Bytes::from(vec![i as u8; 4]),
                pts,
                duration: self.frame_size as i64,
            });
        }
        Ok(self.ready.len())
    }

    fn packet(&mut self) -> Option<NativePacket> {
        self.ready.pop_front()
    }

    fn flush(&mut self) {
        for _ in 0..self.buffered_on_flush {
            self.ready.push_back(NativePacket {
                data: Bytes::from_static(b"tail"),
                pts: 0,
                duration: self.frame_size as i64,
            });
        }
    }
}

fn engine_with_decoder(decoder: FakeDecoder) -> MockEngine {
    let mut engine = MockEngine::new();
    let slot = Mutex::new(Some(decoder));
    engine.expect_open_decoder().returning(move |_| {
        let decoder = slot.lock().unwrap().take().expect("decoder opened once");
        Ok(Box::new(decoder) as Box<dyn NativeDecoder>)
    });
    engine
}

fn engine_with_encoder(encoder: FakeEncoder) -> MockEngine {
    let mut engine = MockEngine::new();
    let slot = Mutex::new(Some(encoder));
    engine.expect_open_encoder().returning(move |_, _| {
        let encoder = slot.lock().unwrap().take().expect("encoder opened once");
        Ok(Box::new(encoder) as Box<dyn NativeEncoder>)
    });
    engine
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn test_decoder_init_failure_carries_native_code() {
    let mut engine = MockEngine::new();
    engine
        .expect_open_decoder()
        .with(eq(CodecVariant::Eac3))
        .times(1)
        .returning(|_| Err(NativeError::ENOMEM));

    let result = DecoderSession::open(&engine, CodecVariant::Eac3);
    assert_eq!(
        result.err(),
        Some(CodecError::InitFailed {
            codec: CodecVariant::Eac3,
            code: -12
        })
    );
}

#[test]
fn test_encoder_init_passes_parameters() {
    let mut engine = MockEngine::new();
    engine
        .expect_open_encoder()
        .withf(|variant, params| {
            *variant == CodecVariant::Ac3
                && *params
                    == EncoderParams {
                        channels: 2,
                        sample_rate: 48_000,
                        bitrate: 192_000,
                    }
        })
        .times(1)
        .returning(|_, _| Err(NativeError::EINVAL));

    let result = EncoderSession::open(&engine, CodecVariant::Ac3, 2, 48_000, 192_000);
    let err = result.err().unwrap();
    assert_eq!(err.native_code(), Some(-22));
    assert!(!err.is_recoverable());
}

#[test]
fn test_encoder_with_zero_frame_size_fails_init() {
    let engine = engine_with_encoder(FakeEncoder::new(0, 2, &[]));
    let result = EncoderSession::open(&engine, CodecVariant::Ac3, 2, 48_000, 192_000);
    assert!(matches!(result, Err(CodecError::InitFailed { .. })));
}

// ============================================================================
// Decode path
// ============================================================================

#[test]
fn test_decode_stages_exact_input() {
    let decoder = FakeDecoder::new(&[native::S16], 2, 4);
    let staged = decoder.staged.clone();
    let engine = engine_with_decoder(decoder);
    let mut session = DecoderSession::open(&engine, CodecVariant::Ac3).unwrap();

    let packet = [9u8, 8, 7, 6, 5];
    let audio = session.decode_packet(&packet, 777).unwrap();

    assert_eq!(*staged.lock().unwrap(), packet.to_vec());
    assert_eq!(audio.timestamp, 777);
    assert_eq!(audio.format.format, SampleFormat::S16);
    assert_eq!(audio.data.len(), 4 * 2 * 2);
}

#[test]
fn test_decode_copies_planes_in_order() {
    // Native planes are longer than the frame needs
    let decoder = FakeDecoder::new(&[native::S32_PLANAR], 3, 2).with_plane_padding(16);
    let engine = engine_with_decoder(decoder);
    let mut session = DecoderSession::open(&engine, CodecVariant::Eac3).unwrap();

    let audio = session.decode_packet(&[1, 2, 3], 0).unwrap();
    let plane_len = 2 * 4;
    assert_eq!(audio.data.len(), plane_len * 3);
    assert!(audio.data[..plane_len].iter().all(|b| *b == 1));
    assert!(audio.data[plane_len..plane_len * 2].iter().all(|b| *b == 2));
    assert!(audio.data[plane_len * 2..].iter().all(|b| *b == 3));
}

#[test]
fn test_short_plane_is_malformed_output() {
    let decoder = FakeDecoder::new(&[native::F32_PLANAR], 2, 8).with_plane_padding(-1);
    let engine = engine_with_decoder(decoder);
    let mut session = DecoderSession::open(&engine, CodecVariant::Ac3).unwrap();

    let err = session.decode_packet(&[0], 0).unwrap_err();
    assert!(matches!(err, CodecError::MalformedOutput(_)));
    assert!(err.is_protocol_violation());
}

#[test]
fn test_unsupported_format_then_supported() {
    let decoder = FakeDecoder::new(&[native::F64, native::F32], 2, 16);
    let engine = engine_with_decoder(decoder);
    let mut session = DecoderSession::open(&engine, CodecVariant::Ac3).unwrap();

    let err = session.decode_packet(&[1], 0).unwrap_err();
    assert_eq!(err, CodecError::UnsupportedFormat(native::F64));

    let audio = session.decode_packet(&[1], 16).unwrap();
    assert_eq!(audio.format.format, SampleFormat::F32);
    assert_eq!(audio.timestamp, 16);
}

#[test]
fn test_decode_failure_carries_native_code() {
    let decoder = FakeDecoder::new(&[], 1, 4).failing(NativeError::INVALID_DATA);
    let engine = engine_with_decoder(decoder);
    let mut session = DecoderSession::open(&engine, CodecVariant::Eac3).unwrap();

    let err = session.decode_packet(&[0xFF], 0).unwrap_err();
    assert_eq!(err.native_code(), Some(-1_094_995_529));
    assert!(err.is_recoverable());

    assert!(session.decode_packet(&[0xFF], 0).is_ok());
}

// ============================================================================
// Encode path
// ============================================================================

#[test]
fn test_zero_packets_is_count_mismatch() {
    let engine = engine_with_encoder(FakeEncoder::new(4, 2, &[0, 1]));
    let mut session = EncoderSession::open(&engine, CodecVariant::Ac3, 2, 48_000, 192_000).unwrap();

    let err = session.encode_frame(&[0.0; 8], 0).unwrap_err();
    assert_eq!(err, CodecError::PacketCountMismatch { produced: 0 });
    assert!(err.is_protocol_violation());

    let packet = session.encode_frame(&[0.0; 8], 4).unwrap();
    assert_eq!(packet.pts, 4);
    assert_eq!(packet.duration, 4);
}

#[test]
fn test_extra_packets_are_discarded_after_mismatch() {
    let engine = engine_with_encoder(FakeEncoder::new(4, 1, &[2, 1]));
    let mut session = EncoderSession::open(&engine, CodecVariant::Ac3, 1, 48_000, 192_000).unwrap();

    let err = session.encode_frame(&[0.0; 4], 0).unwrap_err();
    assert_eq!(err, CodecError::PacketCountMismatch { produced: 2 });

    // The next call sees only its own packet
    let packet = session.encode_frame(&[0.0; 4], 4).unwrap();
    assert_eq!(packet.data, Bytes::from(vec![0u8; 4]));
}

#[test]
fn test_flush_discards_drained_packets() {
    let mut encoder = FakeEncoder::new(4, 1, &[]);
    encoder.buffered_on_flush = 3;
    let engine = engine_with_encoder(encoder);
    let mut session =
        EncoderSession::open(&engine, CodecVariant::Eac3, 1, 48_000, 192_000).unwrap();

    session.flush();
    let packet = session.encode_frame(&[0.5; 4], 8).unwrap();
    assert_eq!(packet.pts, 8);
    session.close();
}
