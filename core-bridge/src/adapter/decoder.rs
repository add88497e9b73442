//! AC-3 / E-AC-3 decoder adapter.

use std::sync::Arc;

use async_trait::async_trait;
use core_codec::{CodecVariant, DecodedAudio};
use tracing::{debug, instrument};

use super::traits::{AudioDecoderAdapter, EncodedPacket};
use crate::arena::SessionHandle;
use crate::client::BridgeClient;
use crate::error::{BridgeError, Result};

/// Decoder adapter that forwards every packet to the codec worker.
pub struct Ac3Decoder {
    client: Arc<BridgeClient>,
    session: Option<(SessionHandle, CodecVariant)>,
}

impl Ac3Decoder {
    pub fn new(client: Arc<BridgeClient>) -> Self {
        Self {
            client,
            session: None,
        }
    }

    /// Both variants decode through the same worker.
    pub fn supports(variant: CodecVariant) -> bool {
        matches!(variant, CodecVariant::Ac3 | CodecVariant::Eac3)
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    pub fn variant(&self) -> Option<CodecVariant> {
        self.session.map(|(_, variant)| variant)
    }

    fn ctx(&self) -> Result<SessionHandle> {
        self.session
            .map(|(ctx, _)| ctx)
            .ok_or(BridgeError::NotInitialized)
    }
}

#[async_trait]
impl AudioDecoderAdapter for Ac3Decoder {
    #[instrument(skip(self), fields(codec = %variant))]
    async fn init(&mut self, variant: CodecVariant) -> Result<()> {
        if self.session.is_some() {
            self.close().await?;
        }

        let ctx = self.client.init_decoder(variant).await?;
        debug!(%ctx, "Decoder session opened");
        self.session = Some((ctx, variant));
        Ok(())
    }

    async fn decode(&mut self, packet: EncodedPacket) -> Result<DecodedAudio> {
        let ctx = self.ctx()?;
        self.client
            .decode(ctx, packet.data, packet.timestamp)
            .await
    }

    async fn flush(&mut self) -> Result<()> {
        let ctx = self.ctx()?;
        self.client.flush_decoder(ctx).await
    }

    async fn close(&mut self) -> Result<()> {
        let (ctx, _) = self.session.take().ok_or(BridgeError::NotInitialized)?;
        self.client.close_decoder(ctx).await?;
        debug!(%ctx, "Decoder session closed");
        Ok(())
    }
}
