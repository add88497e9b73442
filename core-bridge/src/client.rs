//! # Bridge Client
//!
//! Caller-facing handle to the background codec worker.
//!
//! ## Overview
//!
//! Every command gets a correlation id from a per-client counter and a
//! pending entry holding a oneshot completion. A dispatcher thread routes
//! each response to the entry registered under its id, so a caller only
//! suspends on its own command.
//!
//! A response for an id with no pending entry is a protocol violation. The
//! client logs it, fails every outstanding command and refuses new ones.
//!
//! ## Usage
//!
//! ```no_run
//! use core_bridge::BridgeClient;
//! use core_codec::{CodecVariant, ReferenceEngine};
//! use core_runtime::BridgeConfig;
//!
//! # async fn example() -> core_bridge::Result<()> {
//! let client = BridgeClient::spawn(ReferenceEngine::new(), BridgeConfig::default())?;
//! let encoder = client.init_encoder(CodecVariant::Ac3, 2, 48_000, 192_000).await?;
//! let packet = client
//!     .encode(encoder.ctx, vec![0.0; encoder.frame_size * 2], 0)
//!     .await?;
//! assert_eq!(packet.duration, encoder.frame_size as i64);
//! client.close_encoder(encoder.ctx).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use core_codec::{CodecEngine, CodecVariant, DecodedAudio, EncodedOutput};
use core_runtime::BridgeConfig;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::arena::SessionHandle;
use crate::error::{BridgeError, Result};
use crate::protocol::{Command, CommandKind, Envelope, Response, ResponseData};
use crate::worker::Worker;

/// Result of a successful encoder init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderHandle {
    pub ctx: SessionHandle,
    /// Frames the encoder consumes per encode command.
    pub frame_size: usize,
}

struct PendingEntry {
    kind: CommandKind,
    completion: oneshot::Sender<Result<ResponseData>>,
}

/// Correlation table shared by the client and its dispatcher.
#[derive(Default)]
struct PendingCommands {
    entries: Mutex<HashMap<u64, PendingEntry>>,
    poisoned: AtomicBool,
    closed: AtomicBool,
}

impl PendingCommands {
    fn register(
        &self,
        id: u64,
        kind: CommandKind,
    ) -> Result<oneshot::Receiver<Result<ResponseData>>> {
        let (completion, receiver) = oneshot::channel();
        let mut entries = self.entries.lock();
        // Checked under the lock so a concurrent poison cannot miss this entry
        if self.poisoned.load(Ordering::Acquire) {
            return Err(BridgeError::Poisoned);
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(BridgeError::WorkerUnavailable);
        }
        entries.insert(id, PendingEntry { kind, completion });
        Ok(receiver)
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    /// Routes a response to its pending entry.
    fn complete(&self, response: Response) {
        let Response { id, outcome } = response;
        let entry = self.entries.lock().remove(&id);

        let Some(entry) = entry else {
            error!(id, "Received response for unknown correlation id");
            self.poison(id);
            return;
        };

        let result = match outcome {
            Ok(data) if data.kind() == entry.kind => Ok(data),
            Ok(data) => {
                error!(
                    id,
                    expected = %entry.kind,
                    actual = %data.kind(),
                    "Received response of the wrong kind"
                );
                Err(BridgeError::UnexpectedResponse {
                    expected: entry.kind,
                    actual: data.kind(),
                })
            }
            Err(err) => {
                warn!(id, kind = %entry.kind, error = %err, "Codec command failed");
                Err(BridgeError::Codec(err))
            }
        };

        if entry.completion.send(result).is_err() {
            trace!(id, "Caller stopped waiting for response");
        }
    }

    /// Drops every waiting completion once no more responses can arrive.
    fn close(&self) {
        let mut entries = self.entries.lock();
        self.closed.store(true, Ordering::Release);
        entries.clear();
    }

    fn poison(&self, unknown_id: u64) {
        self.poisoned.store(true, Ordering::Release);
        let drained: Vec<(u64, PendingEntry)> = self.entries.lock().drain().collect();
        for (id, entry) in drained {
            let failure = Err(BridgeError::UnknownCorrelationId(unknown_id));
            if entry.completion.send(failure).is_err() {
                trace!(id, "Caller stopped waiting for response");
            }
        }
    }
}

/// Handle for submitting codec commands to the background worker.
///
/// Dropping the client closes the command channel. The worker then finishes
/// queued commands, releases every session and exits.
pub struct BridgeClient {
    commands: mpsc::Sender<Envelope>,
    pending: Arc<PendingCommands>,
    next_id: AtomicU64,
    config: BridgeConfig,
}

impl BridgeClient {
    /// Validates `config`, then starts the worker and dispatcher threads.
    ///
    /// The engine is loaded lazily by the worker on the first init command.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Runtime`] if the configuration is invalid or a
    /// thread cannot be spawned.
    pub fn spawn<E: CodecEngine>(engine: E, config: BridgeConfig) -> Result<Self> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::channel(config.command_queue_capacity);
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        Worker::new(Box::new(engine))
            .spawn(config.worker_thread_name.clone(), command_rx, response_tx)
            .map_err(|e| {
                core_runtime::Error::Internal(format!("Failed to spawn codec worker: {}", e))
            })?;

        let client = Self::from_transport(command_tx, response_rx, config)?;
        info!(
            worker = %client.config.worker_thread_name,
            queue = client.config.command_queue_capacity,
            "Bridge client started"
        );
        Ok(client)
    }

    /// Builds a client over an existing command and response transport.
    pub(crate) fn from_transport(
        commands: mpsc::Sender<Envelope>,
        mut responses: mpsc::UnboundedReceiver<Response>,
        config: BridgeConfig,
    ) -> Result<Self> {
        let pending = Arc::new(PendingCommands::default());
        let routes = Arc::clone(&pending);

        thread::Builder::new()
            .name(format!("{}-dispatch", config.worker_thread_name))
            .spawn(move || {
                while let Some(response) = responses.blocking_recv() {
                    routes.complete(response);
                }
                routes.close();
                debug!("Response dispatcher stopped");
            })
            .map_err(|e| {
                core_runtime::Error::Internal(format!("Failed to spawn response dispatcher: {}", e))
            })?;

        Ok(Self {
            commands,
            pending,
            next_id: AtomicU64::new(0),
            config,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Commands submitted and not yet answered.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a protocol violation has disabled this client.
    pub fn is_poisoned(&self) -> bool {
        self.pending.is_poisoned()
    }

    /// Submits a command and waits for its response.
    ///
    /// Payload buffers inside `command` move to the worker.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Codec`] if the worker rejected the command
    /// - [`BridgeError::Poisoned`] after a protocol violation
    /// - [`BridgeError::WorkerUnavailable`] if the worker is gone
    pub async fn send_command(&self, command: Command) -> Result<ResponseData> {
        if self.pending.is_poisoned() {
            return Err(BridgeError::Poisoned);
        }

        // Nothing is registered until the queue has room, so abandoning the
        // call while it waits here leaves no pending entry behind.
        let permit = self
            .commands
            .reserve()
            .await
            .map_err(|_| BridgeError::WorkerUnavailable)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = command.kind();
        let receiver = self.pending.register(id, kind)?;

        trace!(id, %kind, "Submitting codec command");
        permit.send(Envelope { id, command });

        receiver.await.map_err(|_| BridgeError::WorkerUnavailable)?
    }

    /// Opens a decoder session.
    pub async fn init_decoder(&self, codec: CodecVariant) -> Result<SessionHandle> {
        match self.send_command(Command::InitDecoder { codec }).await? {
            ResponseData::InitDecoder { ctx, .. } => Ok(ctx),
            other => Err(unexpected(CommandKind::InitDecoder, &other)),
        }
    }

    /// Decodes one packet; `encoded_data` moves to the worker.
    pub async fn decode(
        &self,
        ctx: SessionHandle,
        encoded_data: Bytes,
        timestamp: i64,
    ) -> Result<DecodedAudio> {
        let command = Command::Decode {
            ctx,
            encoded_data,
            timestamp,
        };
        match self.send_command(command).await? {
            ResponseData::Decode {
                pcm_data,
                format,
                channels,
                sample_rate,
                sample_count,
                pts,
            } => Ok(DecodedAudio {
                data: pcm_data,
                format: format.descriptor(),
                channels,
                sample_rate,
                sample_count,
                timestamp: pts,
            }),
            other => Err(unexpected(CommandKind::Decode, &other)),
        }
    }

    pub async fn flush_decoder(&self, ctx: SessionHandle) -> Result<()> {
        self.send_command(Command::FlushDecoder { ctx }).await?;
        Ok(())
    }

    pub async fn close_decoder(&self, ctx: SessionHandle) -> Result<()> {
        self.send_command(Command::CloseDecoder { ctx }).await?;
        Ok(())
    }

    /// Opens an encoder session and returns its handle and frame size.
    pub async fn init_encoder(
        &self,
        codec: CodecVariant,
        number_of_channels: u32,
        sample_rate: u32,
        bitrate: u32,
    ) -> Result<EncoderHandle> {
        let command = Command::InitEncoder {
            codec,
            number_of_channels,
            sample_rate,
            bitrate,
        };
        match self.send_command(command).await? {
            ResponseData::InitEncoder { ctx, frame_size } => Ok(EncoderHandle { ctx, frame_size }),
            other => Err(unexpected(CommandKind::InitEncoder, &other)),
        }
    }

    /// Encodes exactly one frame; `audio_data` moves to the worker.
    pub async fn encode(
        &self,
        ctx: SessionHandle,
        audio_data: Vec<f32>,
        timestamp: i64,
    ) -> Result<EncodedOutput> {
        let command = Command::Encode {
            ctx,
            audio_data,
            timestamp,
        };
        match self.send_command(command).await? {
            ResponseData::Encode {
                encoded_data,
                pts,
                duration,
            } => Ok(EncodedOutput {
                data: encoded_data,
                pts,
                duration,
            }),
            other => Err(unexpected(CommandKind::Encode, &other)),
        }
    }

    pub async fn flush_encoder(&self, ctx: SessionHandle) -> Result<()> {
        self.send_command(Command::FlushEncoder { ctx }).await?;
        Ok(())
    }

    pub async fn close_encoder(&self, ctx: SessionHandle) -> Result<()> {
        self.send_command(Command::CloseEncoder { ctx }).await?;
        Ok(())
    }
}

fn unexpected(expected: CommandKind, actual: &ResponseData) -> BridgeError {
    BridgeError::UnexpectedResponse {
        expected,
        actual: actual.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    type ManualClient = (
        BridgeClient,
        mpsc::Receiver<Envelope>,
        mpsc::UnboundedSender<Response>,
    );

    /// Client wired to channels the test drives by hand.
    fn manual_client() -> ManualClient {
        manual_client_with_capacity(4)
    }

    fn manual_client_with_capacity(capacity: usize) -> ManualClient {
        let (command_tx, command_rx) = mpsc::channel(capacity);
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let client =
            BridgeClient::from_transport(command_tx, response_rx, BridgeConfig::default()).unwrap();
        (client, command_rx, response_tx)
    }

    fn handle() -> SessionHandle {
        SessionHandle {
            index: 0,
            generation: 0,
        }
    }

    async fn wait_for_pending(client: &BridgeClient, count: usize) {
        for _ in 0..200 {
            if client.pending_count() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("pending count never reached {}", count);
    }

    #[tokio::test]
    async fn test_ids_start_at_zero_and_increase() {
        let (client, mut commands, responses) = manual_client();
        let client = Arc::new(client);

        for expected_id in 0..3u64 {
            let task = {
                let client = Arc::clone(&client);
                tokio::spawn(async move { client.flush_decoder(handle()).await })
            };
            let envelope = commands.recv().await.unwrap();
            assert_eq!(envelope.id, expected_id);
            responses
                .send(Response::success(envelope.id, ResponseData::FlushDecoder {}))
                .unwrap();
            task.await.unwrap().unwrap();
        }
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_responses_routed_by_id_not_order() {
        let (client, mut commands, responses) = manual_client();
        let client = Arc::new(client);
        let ctx = SessionHandle {
            index: 1,
            generation: 0,
        };

        let first = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.encode(ctx, vec![0.0; 4], 0).await })
        };
        let first_id = commands.recv().await.unwrap().id;
        let second = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.encode(ctx, vec![0.0; 4], 4).await })
        };
        let second_id = commands.recv().await.unwrap().id;

        let packet = |pts| ResponseData::Encode {
            encoded_data: Bytes::from_static(b"p"),
            pts,
            duration: 4,
        };
        responses.send(Response::success(second_id, packet(4))).unwrap();
        responses.send(Response::success(first_id, packet(0))).unwrap();

        assert_eq!(first.await.unwrap().unwrap().pts, 0);
        assert_eq!(second.await.unwrap().unwrap().pts, 4);
    }

    #[tokio::test]
    async fn test_unknown_id_poisons_client() {
        let (client, mut commands, responses) = manual_client();
        let client = Arc::new(client);

        let waiting = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.init_decoder(CodecVariant::Ac3).await })
        };
        let envelope = commands.recv().await.unwrap();
        wait_for_pending(&client, 1).await;

        responses
            .send(Response::success(
                envelope.id + 100,
                ResponseData::FlushDecoder {},
            ))
            .unwrap();

        let err = waiting.await.unwrap().unwrap_err();
        assert!(matches!(err, BridgeError::UnknownCorrelationId(id) if id == envelope.id + 100));
        assert!(client.is_poisoned());
        assert_eq!(client.pending_count(), 0);

        let err = client.init_decoder(CodecVariant::Ac3).await.unwrap_err();
        assert!(matches!(err, BridgeError::Poisoned));
    }

    #[tokio::test]
    async fn test_wrong_kind_is_unexpected_response() {
        let (client, mut commands, responses) = manual_client();
        let client = Arc::new(client);

        let waiting = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.init_decoder(CodecVariant::Eac3).await })
        };
        let envelope = commands.recv().await.unwrap();
        responses
            .send(Response::success(envelope.id, ResponseData::CloseEncoder {}))
            .unwrap();

        let err = waiting.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            BridgeError::UnexpectedResponse {
                expected: CommandKind::InitDecoder,
                actual: CommandKind::CloseEncoder
            }
        ));
        assert!(err.is_protocol_violation());
        assert!(!client.is_poisoned());
    }

    #[tokio::test]
    async fn test_worker_gone_is_unavailable() {
        let (client, commands, responses) = manual_client();
        drop(commands);
        drop(responses);

        let err = client.close_decoder(handle()).await.unwrap_err();
        assert!(matches!(err, BridgeError::WorkerUnavailable));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_submit_leaves_no_pending_entry() {
        let (client, mut commands, responses) = manual_client_with_capacity(1);
        let patience = Duration::from_millis(50);

        // The first call fills the queue and waits for a response; the second
        // waits for queue room. Both are given up on.
        let first = tokio::time::timeout(patience, client.flush_decoder(handle())).await;
        let second = tokio::time::timeout(patience, client.flush_decoder(handle())).await;
        assert!(first.is_err());
        assert!(second.is_err());

        // Only the queued command is registered.
        assert_eq!(client.pending_count(), 1);
        let envelope = commands.try_recv().unwrap();
        assert_eq!(envelope.id, 0);
        assert!(commands.try_recv().is_err());

        responses
            .send(Response::success(envelope.id, ResponseData::FlushDecoder {}))
            .unwrap();
        wait_for_pending(&client, 0).await;
        assert!(!client.is_poisoned());
    }

    #[tokio::test]
    async fn test_dispatcher_exit_fails_waiting_callers() {
        let (client, mut commands, responses) = manual_client();
        let client = Arc::new(client);

        let waiting = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.flush_encoder(handle()).await })
        };
        commands.recv().await.unwrap();
        drop(responses);

        let err = waiting.await.unwrap().unwrap_err();
        assert!(matches!(err, BridgeError::WorkerUnavailable));
    }

    #[test]
    fn test_spawn_rejects_invalid_config() {
        let config = BridgeConfig {
            command_queue_capacity: 0,
            ..BridgeConfig::default()
        };
        let result = BridgeClient::spawn(core_codec::ReferenceEngine::new(), config);
        assert!(matches!(result, Err(BridgeError::Runtime(_))));
    }
}
