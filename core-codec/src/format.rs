//! # Sample Format Table
//!
//! Maps the native engine's sample-format identifiers onto portable
//! descriptors. Identifiers follow the FFmpeg `AVSampleFormat` numbering.
//! Formats without a portable tag (double, 64-bit) are absent on purpose and
//! surface as an unsupported-format error rather than being coerced.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Native sample-format identifiers.
pub mod native {
    pub const U8: i32 = 0;
    pub const S16: i32 = 1;
    pub const S32: i32 = 2;
    pub const F32: i32 = 3;
    pub const F64: i32 = 4;
    pub const U8_PLANAR: i32 = 5;
    pub const S16_PLANAR: i32 = 6;
    pub const S32_PLANAR: i32 = 7;
    pub const F32_PLANAR: i32 = 8;
    pub const F64_PLANAR: i32 = 9;
    pub const S64: i32 = 10;
    pub const S64_PLANAR: i32 = 11;
}

/// Portable sample-format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    #[serde(rename = "u8")]
    U8,
    #[serde(rename = "s16")]
    S16,
    #[serde(rename = "s32")]
    S32,
    #[serde(rename = "f32")]
    F32,
    #[serde(rename = "u8-planar")]
    U8Planar,
    #[serde(rename = "s16-planar")]
    S16Planar,
    #[serde(rename = "s32-planar")]
    S32Planar,
    #[serde(rename = "f32-planar")]
    F32Planar,
}

static FORMAT_TABLE: [(i32, SampleFormat); 8] = [
    (native::U8, SampleFormat::U8),
    (native::S16, SampleFormat::S16),
    (native::S32, SampleFormat::S32),
    (native::F32, SampleFormat::F32),
    (native::U8_PLANAR, SampleFormat::U8Planar),
    (native::S16_PLANAR, SampleFormat::S16Planar),
    (native::S32_PLANAR, SampleFormat::S32Planar),
    (native::F32_PLANAR, SampleFormat::F32Planar),
];

impl SampleFormat {
    pub fn tag(self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S16 => "s16",
            SampleFormat::S32 => "s32",
            SampleFormat::F32 => "f32",
            SampleFormat::U8Planar => "u8-planar",
            SampleFormat::S16Planar => "s16-planar",
            SampleFormat::S32Planar => "s32-planar",
            SampleFormat::F32Planar => "f32-planar",
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::U8Planar => 1,
            SampleFormat::S16 | SampleFormat::S16Planar => 2,
            SampleFormat::S32
            | SampleFormat::S32Planar
            | SampleFormat::F32
            | SampleFormat::F32Planar => 4,
        }
    }

    pub fn is_planar(self) -> bool {
        matches!(
            self,
            SampleFormat::U8Planar
                | SampleFormat::S16Planar
                | SampleFormat::S32Planar
                | SampleFormat::F32Planar
        )
    }

    /// Native identifier for this tag.
    pub fn native_id(self) -> i32 {
        match self {
            SampleFormat::U8 => native::U8,
            SampleFormat::S16 => native::S16,
            SampleFormat::S32 => native::S32,
            SampleFormat::F32 => native::F32,
            SampleFormat::U8Planar => native::U8_PLANAR,
            SampleFormat::S16Planar => native::S16_PLANAR,
            SampleFormat::S32Planar => native::S32_PLANAR,
            SampleFormat::F32Planar => native::F32_PLANAR,
        }
    }

    pub fn descriptor(self) -> FormatDescriptor {
        FormatDescriptor {
            format: self,
            bytes_per_sample: self.bytes_per_sample(),
            planar: self.is_planar(),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Portable description of a PCM layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDescriptor {
    pub format: SampleFormat,
    pub bytes_per_sample: usize,
    pub planar: bool,
}

/// Translates a native sample-format identifier.
///
/// Returns `None` for identifiers with no portable tag.
pub fn lookup(native_id: i32) -> Option<FormatDescriptor> {
    FORMAT_TABLE
        .iter()
        .find(|(id, _)| *id == native_id)
        .map(|(_, format)| format.descriptor())
}
