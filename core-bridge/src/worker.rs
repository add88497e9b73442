//! # Background Worker
//!
//! The single thread that owns the codec engine and every native session.
//!
//! Commands are consumed one at a time in submission order, so responses
//! leave the worker in the same order the commands arrived. Nothing outside
//! this thread ever touches a native context.

use std::io;
use std::thread::{self, JoinHandle};

use core_codec::{
    CodecEngine, CodecError, CodecVariant, DecoderSession, EncoderSession, SessionKind,
};
use tokio::sync::mpsc;
use tracing::{debug, debug_span, info, warn};

use crate::arena::{SessionArena, SessionHandle};
use crate::protocol::{Command, Envelope, Response, ResponseData};

/// A live codec session.
pub(crate) enum Session {
    Decoder(DecoderSession),
    Encoder(EncoderSession),
}

impl Session {
    fn kind(&self) -> SessionKind {
        match self {
            Session::Decoder(_) => SessionKind::Decoder,
            Session::Encoder(_) => SessionKind::Encoder,
        }
    }

    fn close(self) {
        match self {
            Session::Decoder(session) => session.close(),
            Session::Encoder(session) => session.close(),
        }
    }
}

/// Command processor that owns the engine and the session arena.
pub(crate) struct Worker {
    engine: Box<dyn CodecEngine>,
    engine_loaded: bool,
    sessions: SessionArena<Session>,
}

impl Worker {
    pub(crate) fn new(engine: Box<dyn CodecEngine>) -> Self {
        Self {
            engine,
            engine_loaded: false,
            sessions: SessionArena::new(),
        }
    }

    /// Starts the worker on a named thread.
    ///
    /// The thread exits once every command sender is dropped, releasing all
    /// remaining sessions.
    pub(crate) fn spawn(
        self,
        name: String,
        commands: mpsc::Receiver<Envelope>,
        responses: mpsc::UnboundedSender<Response>,
    ) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(name)
            .spawn(move || self.run(commands, responses))
    }

    fn run(
        mut self,
        mut commands: mpsc::Receiver<Envelope>,
        responses: mpsc::UnboundedSender<Response>,
    ) {
        info!("Codec worker started");

        while let Some(Envelope { id, command }) = commands.blocking_recv() {
            let kind = command.kind();
            let span = debug_span!("codec_command", id, kind = %kind);
            let _enter = span.enter();

            let outcome = self.handle(command);
            if let Err(err) = &outcome {
                debug!(error = %err, "Command rejected");
            }

            if responses.send(Response { id, outcome }).is_err() {
                warn!("Response channel closed, stopping codec worker");
                break;
            }
        }

        let released = self.shutdown();
        info!(released, "Codec worker stopped");
    }

    /// Closes every remaining session and returns how many there were.
    pub(crate) fn shutdown(&mut self) -> usize {
        let sessions = self.sessions.drain();
        let released = sessions.len();
        for session in sessions {
            session.close();
        }
        released
    }

    pub(crate) fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Executes one command against the engine and the session arena.
    pub(crate) fn handle(&mut self, command: Command) -> Result<ResponseData, CodecError> {
        match command {
            Command::InitDecoder { codec } => {
                self.ensure_loaded(codec)?;
                let session = DecoderSession::open(self.engine.as_ref(), codec)?;
                let ctx = self.sessions.insert(Session::Decoder(session));
                debug!(%ctx, "Decoder registered");
                Ok(ResponseData::InitDecoder { ctx, frame_size: 0 })
            }
            Command::Decode {
                ctx,
                encoded_data,
                timestamp,
            } => {
                let audio = self.decoder(ctx)?.decode_packet(&encoded_data, timestamp)?;
                Ok(ResponseData::Decode {
                    pcm_data: audio.data,
                    format: audio.format.format,
                    channels: audio.channels,
                    sample_rate: audio.sample_rate,
                    sample_count: audio.sample_count,
                    pts: audio.timestamp,
                })
            }
            Command::FlushDecoder { ctx } => {
                self.decoder(ctx)?.flush();
                Ok(ResponseData::FlushDecoder {})
            }
            Command::CloseDecoder { ctx } => {
                self.take(ctx, SessionKind::Decoder)?.close();
                Ok(ResponseData::CloseDecoder {})
            }
            Command::InitEncoder {
                codec,
                number_of_channels,
                sample_rate,
                bitrate,
            } => {
                self.ensure_loaded(codec)?;
                let session = EncoderSession::open(
                    self.engine.as_ref(),
                    codec,
                    number_of_channels,
                    sample_rate,
                    bitrate,
                )?;
                let frame_size = session.frame_size();
                let ctx = self.sessions.insert(Session::Encoder(session));
                debug!(%ctx, frame_size, "Encoder registered");
                Ok(ResponseData::InitEncoder { ctx, frame_size })
            }
            Command::Encode {
                ctx,
                audio_data,
                timestamp,
            } => {
                let output = self.encoder(ctx)?.encode_frame(&audio_data, timestamp)?;
                Ok(ResponseData::Encode {
                    encoded_data: output.data,
                    pts: output.pts,
                    duration: output.duration,
                })
            }
            Command::FlushEncoder { ctx } => {
                self.encoder(ctx)?.flush();
                Ok(ResponseData::FlushEncoder {})
            }
            Command::CloseEncoder { ctx } => {
                self.take(ctx, SessionKind::Encoder)?.close();
                Ok(ResponseData::CloseEncoder {})
            }
        }
    }

    fn ensure_loaded(&mut self, codec: CodecVariant) -> Result<(), CodecError> {
        if !self.engine_loaded {
            self.engine.load().map_err(|e| CodecError::InitFailed {
                codec,
                code: e.code(),
            })?;
            self.engine_loaded = true;
            debug!("Codec engine loaded");
        }
        Ok(())
    }

    fn decoder(&mut self, ctx: SessionHandle) -> Result<&mut DecoderSession, CodecError> {
        match self.sessions.get_mut(ctx) {
            Some(Session::Decoder(session)) => Ok(session),
            Some(Session::Encoder(_)) => Err(CodecError::SessionKindMismatch {
                expected: SessionKind::Decoder,
            }),
            None => Err(CodecError::InvalidHandle),
        }
    }

    fn encoder(&mut self, ctx: SessionHandle) -> Result<&mut EncoderSession, CodecError> {
        match self.sessions.get_mut(ctx) {
            Some(Session::Encoder(session)) => Ok(session),
            Some(Session::Decoder(_)) => Err(CodecError::SessionKindMismatch {
                expected: SessionKind::Encoder,
            }),
            None => Err(CodecError::InvalidHandle),
        }
    }

    /// Removes a session after checking its direction.
    fn take(&mut self, ctx: SessionHandle, expected: SessionKind) -> Result<Session, CodecError> {
        let kind = self
            .sessions
            .get(ctx)
            .map(Session::kind)
            .ok_or(CodecError::InvalidHandle)?;
        if kind != expected {
            return Err(CodecError::SessionKindMismatch { expected });
        }
        self.sessions.remove(ctx).ok_or(CodecError::InvalidHandle)
    }
}
