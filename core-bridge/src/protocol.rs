//! # Command Protocol
//!
//! Message schema exchanged between the bridge client and the codec worker.
//!
//! ## Wire shape
//!
//! A request is an [`Envelope`]:
//!
//! ```json
//! {
//!   "id": 7,
//!   "command": {
//!     "type": "decode",
//!     "data": { "ctx": {..}, "encodedData": [..], "timestamp": 0 }
//!   }
//! }
//! ```
//!
//! A response echoes the id and carries either a payload tagged with the
//! command kind or an error message:
//!
//! ```json
//! { "id": 7, "success": true, "data": { "type": "flush-decoder" } }
//! { "id": 8, "success": false, "error": "Decode failed with error code -1094995529" }
//! ```
//!
//! Payload buffers are owned by the message. Sending an envelope moves them
//! to the worker, and the worker moves its output back inside the response.

use std::fmt;

use bytes::Bytes;
use core_codec::{CodecError, CodecVariant, SampleFormat};
use serde::{Deserialize, Serialize};

use crate::arena::SessionHandle;

/// Discriminant shared by commands and their responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    InitDecoder,
    Decode,
    FlushDecoder,
    CloseDecoder,
    InitEncoder,
    Encode,
    FlushEncoder,
    CloseEncoder,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::InitDecoder => "init-decoder",
            CommandKind::Decode => "decode",
            CommandKind::FlushDecoder => "flush-decoder",
            CommandKind::CloseDecoder => "close-decoder",
            CommandKind::InitEncoder => "init-encoder",
            CommandKind::Encode => "encode",
            CommandKind::FlushEncoder => "flush-encoder",
            CommandKind::CloseEncoder => "close-encoder",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request for the codec worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    InitDecoder {
        codec: CodecVariant,
    },
    Decode {
        ctx: SessionHandle,
        encoded_data: Bytes,
        timestamp: i64,
    },
    FlushDecoder {
        ctx: SessionHandle,
    },
    CloseDecoder {
        ctx: SessionHandle,
    },
    InitEncoder {
        codec: CodecVariant,
        number_of_channels: u32,
        sample_rate: u32,
        bitrate: u32,
    },
    Encode {
        ctx: SessionHandle,
        /// Exactly one native frame of interleaved samples.
        audio_data: Vec<f32>,
        timestamp: i64,
    },
    FlushEncoder {
        ctx: SessionHandle,
    },
    CloseEncoder {
        ctx: SessionHandle,
    },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::InitDecoder { .. } => CommandKind::InitDecoder,
            Command::Decode { .. } => CommandKind::Decode,
            Command::FlushDecoder { .. } => CommandKind::FlushDecoder,
            Command::CloseDecoder { .. } => CommandKind::CloseDecoder,
            Command::InitEncoder { .. } => CommandKind::InitEncoder,
            Command::Encode { .. } => CommandKind::Encode,
            Command::FlushEncoder { .. } => CommandKind::FlushEncoder,
            Command::CloseEncoder { .. } => CommandKind::CloseEncoder,
        }
    }

    /// Session the command targets, if it targets one.
    pub fn session(&self) -> Option<SessionHandle> {
        match self {
            Command::InitDecoder { .. } | Command::InitEncoder { .. } => None,
            Command::Decode { ctx, .. }
            | Command::FlushDecoder { ctx }
            | Command::CloseDecoder { ctx }
            | Command::Encode { ctx, .. }
            | Command::FlushEncoder { ctx }
            | Command::CloseEncoder { ctx } => Some(*ctx),
        }
    }
}

/// Successful result of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ResponseData {
    InitDecoder {
        ctx: SessionHandle,
        /// Always zero; decoders do not have a fixed input size.
        frame_size: usize,
    },
    Decode {
        pcm_data: Bytes,
        format: SampleFormat,
        channels: u32,
        sample_rate: u32,
        sample_count: usize,
        pts: i64,
    },
    FlushDecoder {},
    CloseDecoder {},
    InitEncoder {
        ctx: SessionHandle,
        frame_size: usize,
    },
    Encode {
        encoded_data: Bytes,
        pts: i64,
        duration: i64,
    },
    FlushEncoder {},
    CloseEncoder {},
}

impl ResponseData {
    pub fn kind(&self) -> CommandKind {
        match self {
            ResponseData::InitDecoder { .. } => CommandKind::InitDecoder,
            ResponseData::Decode { .. } => CommandKind::Decode,
            ResponseData::FlushDecoder {} => CommandKind::FlushDecoder,
            ResponseData::CloseDecoder {} => CommandKind::CloseDecoder,
            ResponseData::InitEncoder { .. } => CommandKind::InitEncoder,
            ResponseData::Encode { .. } => CommandKind::Encode,
            ResponseData::FlushEncoder {} => CommandKind::FlushEncoder,
            ResponseData::CloseEncoder {} => CommandKind::CloseEncoder,
        }
    }
}

/// A command paired with its correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: u64,
    pub command: Command,
}

/// Outcome of one command, correlated by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireResponse", try_from = "WireResponse")]
pub struct Response {
    pub id: u64,
    pub outcome: std::result::Result<ResponseData, CodecError>,
}

impl Response {
    pub fn success(id: u64, data: ResponseData) -> Self {
        Self {
            id,
            outcome: Ok(data),
        }
    }

    pub fn failure(id: u64, error: CodecError) -> Self {
        Self {
            id,
            outcome: Err(error),
        }
    }
}

/// Serialized form of [`Response`].
///
/// Errors cross the wire as text and come back as [`CodecError::Remote`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WireResponse {
    id: u64,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<ResponseData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<Response> for WireResponse {
    fn from(response: Response) -> Self {
        match response.outcome {
            Ok(data) => WireResponse {
                id: response.id,
                success: true,
                data: Some(data),
                error: None,
            },
            Err(error) => WireResponse {
                id: response.id,
                success: false,
                data: None,
                error: Some(error.to_string()),
            },
        }
    }
}

impl TryFrom<WireResponse> for Response {
    type Error = String;

    fn try_from(wire: WireResponse) -> std::result::Result<Self, Self::Error> {
        match (wire.success, wire.data, wire.error) {
            (true, Some(data), _) => Ok(Response::success(wire.id, data)),
            (true, None, _) => Err(format!("response {} is successful but has no data", wire.id)),
            (false, _, error) => Ok(Response::failure(
                wire.id,
                CodecError::Remote(error.unwrap_or_else(|| "unknown error".to_string())),
            )),
        }
    }
}
