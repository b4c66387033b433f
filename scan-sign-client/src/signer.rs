//! The QR-backed [`Signer`] and the scan surface that feeds it.

use async_trait::async_trait;
use scan_sign::{
    constants::span_fields::REQUEST_ID,
    infrastructure::logging,
    qr::{compact_length_prefixed, parse_scanned_signature, SignCommand, SignPayload},
    RequestId, SignatureExchange,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    chain::{Signer, SignerPayload, SignerResult},
    Result,
};

/// Everything a display surface needs to render the signing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrDisplayPayload {
    pub request: SignPayload,
    /// `request`, encoded and split into QR frames.
    pub frames: Vec<Vec<u8>>,
    /// Side length of the rendered code, in pixels.
    pub size: u32,
}

/// Shows signing requests to whoever holds the signing device.
pub trait PayloadDisplay: Send + Sync {
    fn show(&self, payload: &QrDisplayPayload) -> Result<()>;
    fn clear(&self);
}

/// A [`Signer`] that displays the payload as a QR code and waits for the
/// signature to be scanned back in through a [`ScanHandle`].
#[derive(Clone)]
pub struct QrSigner {
    exchange: SignatureExchange,
    display: Arc<dyn PayloadDisplay>,
    qr_size: u32,
}

impl QrSigner {
    pub fn new(exchange: SignatureExchange, display: Arc<dyn PayloadDisplay>, qr_size: u32) -> Self {
        Self {
            exchange,
            display,
            qr_size,
        }
    }
}

impl std::fmt::Debug for QrSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrSigner")
            .field("exchange", &self.exchange)
            .field("qr_size", &self.qr_size)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for QrSigner {
    #[instrument(skip_all, err(Debug))]
    async fn sign_payload(&self, payload: SignerPayload) -> Result<SignerResult> {
        info!(address = %payload.address, nonce = payload.nonce, "(sign)");

        let data = payload.encode();
        let request = SignPayload {
            address: payload.address,
            command: SignCommand::SignTx,
            payload: compact_length_prefixed(&data),
            genesis_hash: payload.genesis_hash,
        };
        let frames = request.frames()?;

        let pending = self.exchange.request_signature(data).await?;
        let display_payload = QrDisplayPayload {
            request,
            frames,
            size: self.qr_size,
        };
        if let Err(e) = self.display.show(&display_payload) {
            // Nobody can scan what was never shown.
            let _ = self.exchange.cancel().await;
            return Err(e);
        }

        // Also clears the display if this future is dropped while waiting.
        let _shown = ShownPayload(self.display.as_ref());
        Ok(pending.await?)
    }
}

/// Clears the display when the wait for a scan ends, however it ends.
struct ShownPayload<'a>(&'a dyn PayloadDisplay);

impl Drop for ShownPayload<'_> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

/// Entry point for scanned signatures.
#[derive(Clone, Debug)]
pub struct ScanHandle {
    exchange: SignatureExchange,
}

impl ScanHandle {
    pub fn new(exchange: SignatureExchange) -> Self {
        Self { exchange }
    }

    /// Hand a scanned signature to whoever is waiting for one.
    ///
    /// `data` is the text decoded from the signature QR. Exchange errors such
    /// as [`scan_sign::ScanSignError::UnexpectedSignature`] are returned to
    /// the scanner as is.
    #[instrument(skip_all, err(Debug), fields(request_id))]
    pub async fn on_scan(&self, id: RequestId, data: &str) -> Result<()> {
        logging::record_field(REQUEST_ID, &id);
        let signature = match parse_scanned_signature(data) {
            Ok(signature) => signature,
            Err(e) => {
                warn!("Ignoring unreadable scan.");
                return Err(e.into());
            }
        };
        self.exchange.submit_signature(id, signature).await?;
        Ok(())
    }
}
