//! Out-of-band signature exchange.
//!
//! A [`SignatureExchange`] sits between a submission flow that needs a
//! signature and a human-mediated channel that delivers one: the payload is
//! displayed, an external device signs it, and the signature is scanned back
//! in. The exchange owns at most one pending request at a time.
//!
//! Each request moves through `Idle -> AwaitingSignature -> Resolved`.
//! `Resolved` is observed by the requester when its [`PendingSignature`]
//! future completes; the exchange itself is back to
//! [`ExchangeStatus::Idle`] at that point and accepts a fresh request. An
//! optional timeout, or an explicit [`SignatureExchange::cancel`], moves an
//! outstanding request back to `Idle` and fails its future instead.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};
use tokio::{
    sync::{oneshot, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};
use tracing_futures::Instrument;

use crate::{
    infrastructure::logging::hex_field,
    types::{RequestId, SignatureResult},
    Result, ScanSignError,
};

type Resolver = oneshot::Sender<Result<SignatureResult>>;

/// How long an exchange waits for a scan before giving up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExchangePolicy {
    /// `None` waits indefinitely.
    pub signature_timeout: Option<Duration>,
}

impl ExchangePolicy {
    pub fn wait_forever() -> Self {
        Self {
            signature_timeout: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            signature_timeout: Some(timeout),
        }
    }
}

/// Externally visible state of a [`SignatureExchange`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeStatus {
    Idle,
    AwaitingSignature { payload_len: usize },
}

/// The single outstanding request. Consumed exactly once: by a scanned
/// signature, by the timeout, or by cancellation.
struct PendingSignatureRequest {
    payload: Vec<u8>,
    resolver: Resolver,
    requested_at: Instant,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl PendingSignatureRequest {
    /// Stops the timeout task and hands back the resolver.
    fn finish(self) -> (Vec<u8>, Resolver) {
        if let Some(timer) = self.timer {
            timer.abort();
        }
        (self.payload, self.resolver)
    }
}

enum Slot {
    Idle,
    AwaitingSignature(PendingSignatureRequest),
}

struct ExchangeState {
    slot: Slot,
    /// Incremented for every accepted request so a stale timer can't fail a
    /// newer request.
    generation: u64,
}

impl ExchangeState {
    fn take_pending(&mut self) -> Option<PendingSignatureRequest> {
        match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Idle => None,
            Slot::AwaitingSignature(pending) => Some(pending),
        }
    }

    /// Frees the slot if the requester has dropped its [`PendingSignature`].
    fn reclaim_abandoned(&mut self) {
        let abandoned = matches!(
            &self.slot,
            Slot::AwaitingSignature(pending) if pending.resolver.is_closed()
        );
        if abandoned {
            if let Some(pending) = self.take_pending() {
                let _ = pending.finish();
                warn!("Dropped a signature request nobody is waiting on.");
            }
        }
    }
}

/// Bridges a "please sign this payload" request to the UI surfaces that
/// display the payload and scan the signature back in.
///
/// Cloning is cheap; clones share the same pending request, which is how the
/// submission flow and the scan handler talk to each other.
#[derive(Clone)]
pub struct SignatureExchange {
    policy: ExchangePolicy,
    state: Arc<Mutex<ExchangeState>>,
}

impl std::fmt::Debug for SignatureExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureExchange")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for SignatureExchange {
    fn default() -> Self {
        Self::new(ExchangePolicy::default())
    }
}

impl SignatureExchange {
    pub fn new(policy: ExchangePolicy) -> Self {
        Self {
            policy,
            state: Arc::new(Mutex::new(ExchangeState {
                slot: Slot::Idle,
                generation: 0,
            })),
        }
    }

    pub fn policy(&self) -> ExchangePolicy {
        self.policy
    }

    /// Record a new pending request for `payload` and return a future that
    /// resolves once a signature is submitted for it.
    ///
    /// Returns immediately. Fails with [`ScanSignError::DoubleRequest`] if a
    /// request is already outstanding; that request is left untouched. A
    /// request whose [`PendingSignature`] was dropped no longer counts as
    /// outstanding and is replaced.
    ///
    /// When the policy has a timeout this spawns a timer task, so it must be
    /// called from within a tokio runtime.
    pub async fn request_signature(&self, payload: Vec<u8>) -> Result<PendingSignature> {
        let mut state = self.state.lock().await;
        state.reclaim_abandoned();
        if let Slot::AwaitingSignature(_) = state.slot {
            warn!("Rejected signature request while another is pending.");
            return Err(ScanSignError::DoubleRequest);
        }

        state.generation += 1;
        let generation = state.generation;
        let (resolver, receiver) = oneshot::channel();
        let timer = self
            .policy
            .signature_timeout
            .map(|timeout| self.spawn_timer(generation, timeout));

        info!(payload_len = payload.len(), "Signature requested.");
        state.slot = Slot::AwaitingSignature(PendingSignatureRequest {
            payload,
            resolver,
            requested_at: Instant::now(),
            generation,
            timer,
        });

        Ok(PendingSignature { receiver })
    }

    /// Resolve the outstanding request with `{id, signature}` and return the
    /// exchange to idle.
    ///
    /// With nothing pending this fails with
    /// [`ScanSignError::UnexpectedSignature`] and changes nothing. If the
    /// requester has already dropped its future, the request is still cleared
    /// and [`ScanSignError::RequestAbandoned`] is returned.
    pub async fn submit_signature(&self, id: RequestId, signature: Vec<u8>) -> Result<()> {
        let pending = {
            let mut state = self.state.lock().await;
            match state.take_pending() {
                Some(pending) => pending,
                None => {
                    warn!(request_id = %id, "Received a signature with no pending request.");
                    return Err(ScanSignError::UnexpectedSignature);
                }
            }
        };

        let waited = pending.requested_at.elapsed();
        let (payload, resolver) = pending.finish();
        // Logged as handed to us, without any QR framing.
        info!(
            request_id = %id,
            data = %hex_field(&payload),
            signature = %hex_field(&signature),
            ?waited,
            "Signature scanned."
        );

        resolver
            .send(Ok(SignatureResult::new(id, signature)))
            .map_err(|_| {
                warn!(request_id = %id, "Requester went away before the signature arrived.");
                ScanSignError::RequestAbandoned
            })
    }

    /// Fail the outstanding request with [`ScanSignError::RequestCancelled`]
    /// and return to idle.
    pub async fn cancel(&self) -> Result<()> {
        let pending = self.state.lock().await.take_pending();
        match pending {
            Some(pending) => {
                let (_, resolver) = pending.finish();
                info!("Signature request cancelled.");
                // The requester may already be gone, which is fine here.
                let _ = resolver.send(Err(ScanSignError::RequestCancelled));
                Ok(())
            }
            None => Err(ScanSignError::NothingPending),
        }
    }

    /// An abandoned request reads as [`ExchangeStatus::Idle`] and is cleared.
    pub async fn status(&self) -> ExchangeStatus {
        let mut state = self.state.lock().await;
        state.reclaim_abandoned();
        match &state.slot {
            Slot::Idle => ExchangeStatus::Idle,
            Slot::AwaitingSignature(pending) => ExchangeStatus::AwaitingSignature {
                payload_len: pending.payload.len(),
            },
        }
    }

    /// The payload of the outstanding request, exactly as it was handed to
    /// [`Self::request_signature`].
    pub async fn pending_payload(&self) -> Option<Vec<u8>> {
        match &self.state.lock().await.slot {
            Slot::Idle => None,
            Slot::AwaitingSignature(pending) => Some(pending.payload.clone()),
        }
    }

    fn spawn_timer(&self, generation: u64, timeout: Duration) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(
            async move {
                tokio::time::sleep(timeout).await;

                let mut state = state.lock().await;
                let is_current = matches!(
                    &state.slot,
                    Slot::AwaitingSignature(pending) if pending.generation == generation
                );
                if !is_current {
                    return;
                }
                if let Some(pending) = state.take_pending() {
                    warn!(?timeout, "No signature scanned before the timeout.");
                    // Don't abort ourselves; just drop the handle.
                    let _ = pending
                        .resolver
                        .send(Err(ScanSignError::SignatureTimeout(timeout)));
                }
            }
            .in_current_span(),
        )
    }
}

/// Future half of a pending signature request.
///
/// Resolves with the scanned [`SignatureResult`], or with an error if the
/// request timed out, was cancelled, or the exchange was dropped.
#[derive(Debug)]
#[must_use = "a signature request does nothing unless its result is awaited"]
pub struct PendingSignature {
    receiver: oneshot::Receiver<Result<SignatureResult>>,
}

impl Future for PendingSignature {
    type Output = Result<SignatureResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // The exchange was dropped with our request still in it.
            Poll::Ready(Err(_)) => Poll::Ready(Err(ScanSignError::RequestCancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}
