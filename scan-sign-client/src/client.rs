//! Client object that drives a transfer from signing to inclusion.

use scan_sign::{
    constants::span_fields::SUBMISSION_ID,
    infrastructure::logging,
    lifecycle::{watch_lifecycle, LifecycleOutcome, LifecycleReport},
    SignatureExchange,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    chain::ChainClient,
    config::Config,
    signer::{PayloadDisplay, QrSigner, ScanHandle},
    Result, ScanSignClientError,
};

/// A `ScanSignClient` wraps a chain client together with the signature
/// exchange that connects its signing requests to a QR display and a scanner.
///
/// There is one exchange per client, so at most one transfer can be waiting
/// for a signature at a time. A second [`Self::submit_transfer`] while the
/// first is still waiting fails with
/// [`scan_sign::ScanSignError::DoubleRequest`].
pub struct ScanSignClient {
    config: Config,
    chain: Arc<dyn ChainClient>,
    exchange: SignatureExchange,
    signer: QrSigner,
}

impl std::fmt::Debug for ScanSignClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSignClient")
            .field("config", &self.config)
            .field("exchange", &self.exchange)
            .finish_non_exhaustive()
    }
}

impl ScanSignClient {
    pub fn new(
        config: Config,
        chain: Arc<dyn ChainClient>,
        display: Arc<dyn PayloadDisplay>,
    ) -> Self {
        let exchange = SignatureExchange::new(config.exchange_policy);
        let signer = QrSigner::new(exchange.clone(), display, config.qr_size);
        info!(endpoint = %config.endpoint, sender = %config.sender, "Client ready.");

        Self {
            config,
            chain,
            exchange,
            signer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The exchange shared by this client's signer, for status queries and
    /// cancellation.
    pub fn exchange(&self) -> &SignatureExchange {
        &self.exchange
    }

    /// Handle for the scan surface to deliver signatures through.
    pub fn scan_handle(&self) -> ScanHandle {
        ScanHandle::new(self.exchange.clone())
    }

    /// Transfer the configured amount from the sender to the receiver.
    ///
    /// Waits for the signature to be scanned, submits the transaction, and
    /// follows its status until it is in a block or rejected. The returned
    /// report says how it ended; use [`check_outcome`] to turn a failed
    /// ending into an error.
    #[instrument(skip_all, err(Debug), fields(submission_id))]
    pub async fn submit_transfer(&self) -> Result<LifecycleReport> {
        logging::record_field(SUBMISSION_ID, &Uuid::new_v4());
        info!(
            receiver = %self.config.receiver,
            amount = self.config.amount,
            "Submitting transfer."
        );

        let tx = self
            .chain
            .create_transfer(&self.config.receiver, self.config.amount);
        let (events, subscription) = self
            .chain
            .sign_and_send(tx, &self.config.sender, &self.signer)
            .await?;

        let report = watch_lifecycle(events, subscription, self.chain.registry()).await;
        info!(success = report.outcome.is_success(), "Transfer finished.");
        Ok(report)
    }
}

/// Map a lifecycle ending to `Ok` if the transaction made it into a block and
/// dispatched successfully.
pub fn check_outcome(outcome: &LifecycleOutcome) -> Result<()> {
    match outcome {
        LifecycleOutcome::InBlock { .. } | LifecycleOutcome::Finalized(_) => Ok(()),
        LifecycleOutcome::DispatchFailed { error, .. } => {
            Err(ScanSignClientError::Dispatch(error.clone()))
        }
        LifecycleOutcome::Rejected(kind) => {
            Err(ScanSignClientError::NotIncluded(kind.to_string()))
        }
        LifecycleOutcome::SubmissionFailed(message) => {
            Err(ScanSignClientError::Submission(message.clone()))
        }
        LifecycleOutcome::StreamEnded => Err(ScanSignClientError::NotIncluded(
            "status stream ended early".to_string(),
        )),
    }
}
