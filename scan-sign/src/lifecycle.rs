//! Status events for a submitted transaction and the logic that follows them
//! to completion.
//!
//! A chain client reports progress for one transaction as a lazy, in-order
//! stream of [`TransactionLifecycleEvent`]s. [`watch_lifecycle`] consumes that
//! stream until the first terminal event and releases the chain client's
//! [`Subscription`] exactly once.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display, Formatter},
    pin::Pin,
};
use strum::IntoStaticStr;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    infrastructure::logging::hex_field,
    registry::{describe_dispatch_error, DescribedDispatchError, ErrorRegistry},
};

/// Boxed lifecycle stream as handed out by chain clients.
pub type LifecycleStream = Pin<Box<dyn Stream<Item = TransactionLifecycleEvent> + Send>>;

/// A 32-byte block or transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct H256(pub [u8; 32]);

impl Display for H256 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex_field(&self.0))
    }
}

impl Debug for H256 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// An event emitted by the runtime while executing a block, e.g.
/// `system.ExtrinsicSuccess`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub section: String,
    pub method: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EventRecord {
    pub fn new(section: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            method: method.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

impl Display for EventRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.section, self.method)?;
        if !self.data.is_null() {
            write!(f, "({})", self.data)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchClass {
    Normal,
    Operational,
    Mandatory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pays {
    Yes,
    No,
}

/// Weight and fee information extracted from `ExtrinsicSuccess` /
/// `ExtrinsicFailed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchInfo {
    pub weight: u64,
    pub class: DispatchClass,
    pub pays_fee: Pays,
}

/// Index of the pallet and of the error inside it, as reported by the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleError {
    pub index: u8,
    pub error: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchError {
    /// Decodable through an [`ErrorRegistry`].
    Module(ModuleError),
    BadOrigin,
    CannotLookup,
    Other(String),
}

impl DispatchError {
    /// Render the error the way the chain tooling displays it, e.g.
    /// `"BadOrigin"` or `{"Other":"..."}`.
    pub fn to_human(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchOutcome {
    Success(DispatchInfo),
    Failed {
        info: DispatchInfo,
        error: DispatchError,
    },
}

impl DispatchOutcome {
    pub fn info(&self) -> &DispatchInfo {
        match self {
            DispatchOutcome::Success(info) => info,
            DispatchOutcome::Failed { info, .. } => info,
        }
    }

    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            DispatchOutcome::Success(_) => None,
            DispatchOutcome::Failed { error, .. } => Some(error),
        }
    }
}

/// Progress of one submitted transaction.
#[derive(Clone, Debug, PartialEq, IntoStaticStr)]
pub enum TransactionLifecycleEvent {
    /// Waiting in the pool for an earlier nonce.
    Future,
    Ready,
    Broadcast(Vec<String>),
    InBlock {
        block_hash: H256,
        events: Vec<EventRecord>,
        dispatch: DispatchOutcome,
    },
    /// The including block was retracted; the transaction may be included
    /// again.
    Retracted(H256),
    FinalityTimeout(H256),
    Finalized(H256),
    Usurped(H256),
    Dropped,
    Invalid,
    /// The submission channel itself reported an error.
    Error(String),
}

impl TransactionLifecycleEvent {
    /// Variant name, e.g. `InBlock`.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Whether the stream ends after this event.
    pub fn is_terminal(&self) -> bool {
        match self {
            TransactionLifecycleEvent::Future
            | TransactionLifecycleEvent::Ready
            | TransactionLifecycleEvent::Broadcast(_)
            | TransactionLifecycleEvent::Retracted(_) => false,
            TransactionLifecycleEvent::InBlock { .. }
            | TransactionLifecycleEvent::FinalityTimeout(_)
            | TransactionLifecycleEvent::Finalized(_)
            | TransactionLifecycleEvent::Usurped(_)
            | TransactionLifecycleEvent::Dropped
            | TransactionLifecycleEvent::Invalid
            | TransactionLifecycleEvent::Error(_) => true,
        }
    }
}

impl Display for TransactionLifecycleEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionLifecycleEvent::Broadcast(peers) => write!(f, "Broadcast({peers:?})"),
            TransactionLifecycleEvent::InBlock { block_hash, .. } => {
                write!(f, "InBlock({block_hash})")
            }
            TransactionLifecycleEvent::Retracted(hash)
            | TransactionLifecycleEvent::FinalityTimeout(hash)
            | TransactionLifecycleEvent::Finalized(hash)
            | TransactionLifecycleEvent::Usurped(hash) => write!(f, "{}({hash})", self.kind()),
            TransactionLifecycleEvent::Error(message) => write!(f, "Error({message})"),
            TransactionLifecycleEvent::Future
            | TransactionLifecycleEvent::Ready
            | TransactionLifecycleEvent::Dropped
            | TransactionLifecycleEvent::Invalid => f.write_str(self.kind()),
        }
    }
}

/// Handle on a chain client's status subscription.
///
/// [`Subscription::unsubscribe`] consumes the handle so the release callback
/// can't run twice. A handle dropped without being released is released on
/// drop, so it can't leak either.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            debug!("Status subscription released.");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.release.is_some() {
            warn!("Status subscription dropped without unsubscribing.");
            self.release_now();
        }
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// How a transaction's lifecycle ended.
#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleOutcome {
    InBlock {
        block_hash: H256,
        info: DispatchInfo,
    },
    DispatchFailed {
        block_hash: H256,
        error: DescribedDispatchError,
    },
    Finalized(H256),
    /// `Dropped`, `Invalid`, `Usurped`, or `FinalityTimeout`.
    Rejected(&'static str),
    SubmissionFailed(String),
    /// The stream ended before any terminal event.
    StreamEnded,
}

impl LifecycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            LifecycleOutcome::InBlock { .. } | LifecycleOutcome::Finalized(_)
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LifecycleReport {
    /// Every status seen, in order.
    pub statuses: Vec<&'static str>,
    pub outcome: LifecycleOutcome,
}

/// Follow `events` until a terminal status, logging each one, then release
/// `subscription`.
///
/// Always terminates for a finite stream and releases the subscription exactly
/// once, whichever way the lifecycle ends.
#[instrument(skip_all)]
pub async fn watch_lifecycle<S>(
    mut events: S,
    subscription: Subscription,
    registry: &dyn ErrorRegistry,
) -> LifecycleReport
where
    S: Stream<Item = TransactionLifecycleEvent> + Unpin,
{
    let mut statuses = Vec::new();
    let mut outcome = LifecycleOutcome::StreamEnded;

    while let Some(event) = events.next().await {
        info!("(status) {event}");
        statuses.push(event.kind());

        if let Some(terminal) = terminal_outcome(event, registry) {
            outcome = terminal;
            break;
        }
    }

    if outcome == LifecycleOutcome::StreamEnded {
        warn!("Status stream ended without a terminal status.");
    }
    subscription.unsubscribe();

    LifecycleReport { statuses, outcome }
}

fn terminal_outcome(
    event: TransactionLifecycleEvent,
    registry: &dyn ErrorRegistry,
) -> Option<LifecycleOutcome> {
    let outcome = match event {
        TransactionLifecycleEvent::Future
        | TransactionLifecycleEvent::Ready
        | TransactionLifecycleEvent::Broadcast(_)
        | TransactionLifecycleEvent::Retracted(_) => return None,

        TransactionLifecycleEvent::InBlock {
            block_hash,
            events,
            dispatch,
        } => {
            if !events.is_empty() {
                let rendered: Vec<String> = events.iter().map(ToString::to_string).collect();
                info!("(events/system) {rendered:?}");
            }
            info!(
                "(dispatch) {}",
                serde_json::to_string(dispatch.info()).unwrap_or_default()
            );

            match dispatch {
                DispatchOutcome::Success(info) => LifecycleOutcome::InBlock { block_hash, info },
                DispatchOutcome::Failed { error, .. } => {
                    let described = describe_dispatch_error(registry, &error);
                    error!("(error) {described}");
                    LifecycleOutcome::DispatchFailed {
                        block_hash,
                        error: described,
                    }
                }
            }
        }
        TransactionLifecycleEvent::Finalized(hash) => LifecycleOutcome::Finalized(hash),
        TransactionLifecycleEvent::Error(message) => {
            error!("(error) {message}");
            LifecycleOutcome::SubmissionFailed(message)
        }
        rejected @ (TransactionLifecycleEvent::FinalityTimeout(_)
        | TransactionLifecycleEvent::Usurped(_)
        | TransactionLifecycleEvent::Dropped
        | TransactionLifecycleEvent::Invalid) => LifecycleOutcome::Rejected(rejected.kind()),
    };
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ErrorMetadata, StaticErrorRegistry};
    use futures::stream;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    const BLOCK: H256 = H256([7; 32]);
    const INFO: DispatchInfo = DispatchInfo {
        weight: 195_000_000,
        class: DispatchClass::Normal,
        pays_fee: Pays::Yes,
    };

    fn counted_subscription() -> (Subscription, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let subscription = Subscription::new(move || {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
        });
        (subscription, count)
    }

    fn registry() -> StaticErrorRegistry {
        StaticErrorRegistry::new().with_error(
            ModuleError { index: 4, error: 2 },
            ErrorMetadata::new("balances", "InsufficientBalance")
                .with_documentation(["Balance too low to send value."]),
        )
    }

    async fn watch(events: Vec<TransactionLifecycleEvent>) -> (LifecycleReport, usize) {
        let (subscription, count) = counted_subscription();
        let report = watch_lifecycle(stream::iter(events), subscription, &registry()).await;
        (report, count.load(Ordering::SeqCst))
    }

    fn in_block(dispatch: DispatchOutcome) -> TransactionLifecycleEvent {
        TransactionLifecycleEvent::InBlock {
            block_hash: BLOCK,
            events: vec![EventRecord::new("system", "ExtrinsicSuccess")],
            dispatch,
        }
    }

    #[tokio::test]
    async fn stops_at_in_block_and_ignores_later_events() {
        let (report, released) = watch(vec![
            TransactionLifecycleEvent::Ready,
            TransactionLifecycleEvent::Broadcast(vec!["peer".into()]),
            in_block(DispatchOutcome::Success(INFO)),
            TransactionLifecycleEvent::Finalized(BLOCK),
        ])
        .await;

        assert_eq!(report.statuses, vec!["Ready", "Broadcast", "InBlock"]);
        assert_eq!(
            report.outcome,
            LifecycleOutcome::InBlock {
                block_hash: BLOCK,
                info: INFO
            }
        );
        assert_eq!(released, 1);
    }

    #[tokio::test]
    async fn module_error_is_decoded_through_registry() {
        let (report, released) = watch(vec![in_block(DispatchOutcome::Failed {
            info: INFO,
            error: DispatchError::Module(ModuleError { index: 4, error: 2 }),
        })])
        .await;

        match report.outcome {
            LifecycleOutcome::DispatchFailed { error, .. } => assert_eq!(
                error.to_string(),
                "balances.InsufficientBalance: Balance too low to send value."
            ),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(released, 1);
    }

    #[tokio::test]
    async fn every_terminal_variant_releases_once() {
        let terminals = vec![
            in_block(DispatchOutcome::Success(INFO)),
            in_block(DispatchOutcome::Failed {
                info: INFO,
                error: DispatchError::BadOrigin,
            }),
            TransactionLifecycleEvent::FinalityTimeout(BLOCK),
            TransactionLifecycleEvent::Finalized(BLOCK),
            TransactionLifecycleEvent::Usurped(BLOCK),
            TransactionLifecycleEvent::Dropped,
            TransactionLifecycleEvent::Invalid,
            TransactionLifecycleEvent::Error("pool rejected".into()),
        ];

        for terminal in terminals {
            assert!(terminal.is_terminal());
            let kind = terminal.kind();
            let (report, released) = watch(vec![
                TransactionLifecycleEvent::Future,
                TransactionLifecycleEvent::Ready,
                terminal,
                TransactionLifecycleEvent::Ready,
            ])
            .await;
            assert_eq!(report.statuses.last(), Some(&kind));
            assert_eq!(released, 1, "{kind} released {released} times");
        }
    }

    #[tokio::test]
    async fn stream_without_terminal_still_releases() {
        let (report, released) = watch(vec![
            TransactionLifecycleEvent::Ready,
            TransactionLifecycleEvent::Retracted(BLOCK),
        ])
        .await;
        assert_eq!(report.outcome, LifecycleOutcome::StreamEnded);
        assert_eq!(released, 1);

        let (report, released) = watch(Vec::new()).await;
        assert!(report.statuses.is_empty());
        assert_eq!(released, 1);
    }

    #[test]
    fn dropped_subscription_releases_once() {
        let (subscription, count) = counted_subscription();
        drop(subscription);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let (subscription, count) = counted_subscription();
        subscription.unsubscribe();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn events_render_like_chain_tooling() {
        let event = EventRecord::new("balances", "Transfer")
            .with_data(serde_json::json!(["alice", "bob", 10]));
        assert_eq!(event.to_string(), r#"balances.Transfer(["alice","bob",10])"#);
        assert_eq!(
            EventRecord::new("system", "ExtrinsicSuccess").to_string(),
            "system.ExtrinsicSuccess"
        );
        assert_eq!(DispatchError::BadOrigin.to_human(), r#""BadOrigin""#);
        assert_eq!(
            DispatchError::Other("nope".into()).to_human(),
            r#"{"Other":"nope"}"#
        );
        assert_eq!(TransactionLifecycleEvent::Dropped.to_string(), "Dropped");
    }
}
