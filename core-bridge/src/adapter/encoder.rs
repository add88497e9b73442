//! AC-3 / E-AC-3 encoder adapter.
//!
//! Hosts hand over PCM in whatever chunk sizes they have. The adapter buffers
//! it in a [`FrameAccumulator`] and sends the worker exactly one native frame
//! per encode command.

use std::sync::Arc;

use async_trait::async_trait;
use core_codec::{CodecDescription, CodecVariant};
use tracing::{debug, instrument, trace};

use super::traits::{AudioEncoderAdapter, EncodedPacket, EncoderConfig, PcmChunk};
use crate::accumulator::FrameAccumulator;
use crate::arena::SessionHandle;
use crate::client::BridgeClient;
use crate::error::{BridgeError, Result};

/// Highest channel count either variant accepts.
pub const MAX_CHANNELS: u32 = 8;

struct EncoderState {
    ctx: SessionHandle,
    variant: CodecVariant,
    config: EncoderConfig,
    accumulator: FrameAccumulator,
    /// Set after init and flush; the next packet carries the description.
    describe_next: bool,
    /// Packets encoded but not yet handed to the caller. A failed encode
    /// leaves earlier packets of the batch here for the next call.
    ready: Vec<EncodedPacket>,
}

/// Encoder adapter that chunks PCM into native frames.
pub struct Ac3Encoder {
    client: Arc<BridgeClient>,
    state: Option<EncoderState>,
}

impl Ac3Encoder {
    pub fn new(client: Arc<BridgeClient>) -> Self {
        Self {
            client,
            state: None,
        }
    }

    /// Whether `config` can be encoded as `variant`.
    ///
    /// The bitrate is not checked here; the worker validates it on init.
    pub fn supports(variant: CodecVariant, config: &EncoderConfig) -> bool {
        (1..=MAX_CHANNELS).contains(&config.channels)
            && variant.supported_sample_rates().contains(&config.sample_rate)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Native frame size of the open session.
    pub fn frame_size(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.accumulator.frame_size())
    }

    /// Frames buffered but not yet encoded.
    pub fn buffered_frames(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |s| s.accumulator.pending_frames())
    }

    /// Packets held back by a failed encode or flush.
    ///
    /// They are also returned ahead of new output by the next successful
    /// [`encode`](AudioEncoderAdapter::encode) or
    /// [`flush`](AudioEncoderAdapter::flush). Closing the session discards them.
    pub fn take_ready_packets(&mut self) -> Vec<EncodedPacket> {
        self.state
            .as_mut()
            .map_or_else(Vec::new, |s| std::mem::take(&mut s.ready))
    }

    /// Encodes every complete frame currently buffered into `state.ready`.
    async fn drain(client: &BridgeClient, state: &mut EncoderState) -> Result<()> {
        while let Some(frame) = state.accumulator.next_frame() {
            let output = client
                .encode(state.ctx, frame.samples, frame.timestamp)
                .await?;
            let mut packet = state.accumulator.complete_packet(output)?;

            if state.describe_next {
                packet = packet.with_metadata(CodecDescription::new(
                    state.variant,
                    state.config.channels,
                    state.config.sample_rate,
                ));
                state.describe_next = false;
            }

            trace!(
                timestamp = packet.timestamp,
                bytes = packet.len(),
                "Encoded packet"
            );
            state.ready.push(packet);
        }
        Ok(())
    }
}

#[async_trait]
impl AudioEncoderAdapter for Ac3Encoder {
    #[instrument(skip(self), fields(codec = %variant))]
    async fn init(&mut self, variant: CodecVariant, config: EncoderConfig) -> Result<()> {
        if !Self::supports(variant, &config) {
            return Err(BridgeError::UnsupportedConfig(format!(
                "{} cannot encode {} channels at {} Hz",
                variant, config.channels, config.sample_rate
            )));
        }
        let bitrate = config.bitrate.ok_or_else(|| {
            BridgeError::UnsupportedConfig("a bitrate is required".to_string())
        })?;

        if self.state.is_some() {
            self.close().await?;
        }

        let handle = self
            .client
            .init_encoder(variant, config.channels, config.sample_rate, bitrate)
            .await?;

        let runtime = self.client.config();
        let accumulator = match FrameAccumulator::new(
            config.channels as usize,
            handle.frame_size,
            runtime.initial_accumulator_capacity,
            runtime.duration_policy,
        ) {
            Ok(accumulator) => accumulator,
            Err(err) => {
                self.client.close_encoder(handle.ctx).await?;
                return Err(err);
            }
        };

        debug!(ctx = %handle.ctx, frame_size = handle.frame_size, "Encoder session opened");
        self.state = Some(EncoderState {
            ctx: handle.ctx,
            variant,
            config,
            accumulator,
            describe_next: true,
            ready: Vec::new(),
        });
        Ok(())
    }

    async fn encode(&mut self, chunk: PcmChunk) -> Result<Vec<EncodedPacket>> {
        let state = self.state.as_mut().ok_or(BridgeError::NotInitialized)?;

        if chunk.channels != state.config.channels
            || chunk.sample_rate != state.config.sample_rate
        {
            return Err(BridgeError::InvalidInput(format!(
                "chunk is {} channels at {} Hz, encoder expects {} channels at {} Hz",
                chunk.channels,
                chunk.sample_rate,
                state.config.channels,
                state.config.sample_rate
            )));
        }

        state.accumulator.push(&chunk.samples, chunk.timestamp)?;
        Self::drain(&self.client, state).await?;
        Ok(std::mem::take(&mut state.ready))
    }

    async fn flush(&mut self) -> Result<Vec<EncodedPacket>> {
        let state = self.state.as_mut().ok_or(BridgeError::NotInitialized)?;

        state.accumulator.pad_final_frame();
        Self::drain(&self.client, state).await?;

        self.client.flush_encoder(state.ctx).await?;
        state.accumulator.reset();
        state.describe_next = true;

        let packets = std::mem::take(&mut state.ready);
        debug!(packets = packets.len(), "Encoder flushed");
        Ok(packets)
    }

    async fn close(&mut self) -> Result<()> {
        let state = self.state.take().ok_or(BridgeError::NotInitialized)?;
        self.client.close_encoder(state.ctx).await?;
        debug!(ctx = %state.ctx, dropped = state.ready.len(), "Encoder session closed");
        Ok(())
    }
}
