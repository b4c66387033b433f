//! An in-process chain for demos and tests.
//!
//! [`DevChain`] plays the part of a node: it builds transfer calls, asks the
//! signer for a signature, and then streams a scripted set of status events
//! whose ending is chosen by [`DevOutcome`]. Signatures are not verified.

use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use scan_sign::{
    lifecycle::{
        DispatchClass, DispatchError, DispatchInfo, DispatchOutcome, EventRecord,
        LifecycleStream, ModuleError, Pays, Subscription, TransactionLifecycleEvent, H256,
    },
    qr::compact_encode,
    registry::{ErrorMetadata, ErrorRegistry, StaticErrorRegistry},
    ss58::Ss58Address,
};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use strum::{Display, EnumString};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, instrument};
use tracing_futures::Instrument;

use crate::{
    chain::{ChainClient, Signer, SignerPayload, Transaction},
    config::DevChainConfig,
    Result, ScanSignClientError,
};

/// Genesis hash of Kusama, which the dev chain pretends to be.
pub const DEV_GENESIS_HASH: H256 = H256([
    0xb0, 0xa8, 0xd4, 0x93, 0x28, 0x5c, 0x2d, 0xf7, 0x32, 0x90, 0xdf, 0xb7, 0xe6, 0x1f, 0x87, 0x0f,
    0x17, 0xb4, 0x18, 0x01, 0x19, 0x7a, 0x14, 0x9c, 0xa9, 0x36, 0x54, 0x49, 0x9e, 0xa3, 0xda, 0xfe,
]);

const BALANCES_PALLET: u8 = 4;
const TRANSFER_CALL: u8 = 0;
const INSUFFICIENT_BALANCE: ModuleError = ModuleError {
    index: BALANCES_PALLET,
    error: 2,
};
const TRANSFER_WEIGHT: u64 = 195_952_000;
const STATUS_BUFFER: usize = 8;
const DEV_PEER: &str = "12D3KooWDevChainPeer";

/// How transactions submitted to a [`DevChain`] end.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DevOutcome {
    /// Included in a block and dispatched successfully.
    #[default]
    Success,
    /// Included in a block, dispatch fails with `balances.InsufficientBalance`.
    ModuleError,
    /// Accepted into the pool, then dropped.
    Dropped,
    /// Rejected by the pool as invalid.
    Invalid,
}

#[derive(Debug)]
pub struct DevChain {
    outcome: DevOutcome,
    next_nonce: AtomicU64,
    registry: StaticErrorRegistry,
    released_subscriptions: Arc<AtomicUsize>,
}

impl DevChain {
    pub fn new(config: &DevChainConfig) -> Self {
        Self {
            outcome: config.outcome,
            next_nonce: AtomicU64::new(config.nonce),
            registry: balances_registry(),
            released_subscriptions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How transactions submitted to this chain end.
    pub fn outcome(&self) -> DevOutcome {
        self.outcome
    }

    /// Nonce the next accepted transaction will use.
    pub fn next_nonce(&self) -> u64 {
        self.next_nonce.load(Ordering::SeqCst)
    }

    /// How many status subscriptions have been released so far.
    pub fn released_subscriptions(&self) -> usize {
        self.released_subscriptions.load(Ordering::SeqCst)
    }

    fn status_events(
        &self,
        nonce: u64,
        from: &Ss58Address,
        tx: &Transaction,
    ) -> Vec<TransactionLifecycleEvent> {
        let block_hash = H256(StdRng::seed_from_u64(nonce).gen());
        let info = DispatchInfo {
            weight: TRANSFER_WEIGHT,
            class: DispatchClass::Normal,
            pays_fee: Pays::Yes,
        };
        let broadcast = TransactionLifecycleEvent::Broadcast(vec![DEV_PEER.to_string()]);

        match self.outcome {
            DevOutcome::Success => vec![
                TransactionLifecycleEvent::Ready,
                broadcast,
                TransactionLifecycleEvent::InBlock {
                    block_hash,
                    events: vec![
                        EventRecord::new("balances", "Transfer").with_data(serde_json::json!([
                            from.to_string(),
                            tx.dest.to_string(),
                            tx.amount
                        ])),
                        EventRecord::new("system", "ExtrinsicSuccess")
                            .with_data(serde_json::json!([info])),
                    ],
                    dispatch: DispatchOutcome::Success(info),
                },
                TransactionLifecycleEvent::Finalized(block_hash),
            ],
            DevOutcome::ModuleError => {
                let error = DispatchError::Module(INSUFFICIENT_BALANCE);
                vec![
                    TransactionLifecycleEvent::Ready,
                    broadcast,
                    TransactionLifecycleEvent::InBlock {
                        block_hash,
                        events: vec![EventRecord::new("system", "ExtrinsicFailed")
                            .with_data(serde_json::json!([error, info]))],
                        dispatch: DispatchOutcome::Failed { info, error },
                    },
                ]
            }
            DevOutcome::Dropped => vec![
                TransactionLifecycleEvent::Ready,
                broadcast,
                TransactionLifecycleEvent::Dropped,
            ],
            DevOutcome::Invalid => vec![TransactionLifecycleEvent::Invalid],
        }
    }
}

impl Default for DevChain {
    fn default() -> Self {
        Self::new(&DevChainConfig::default())
    }
}

#[async_trait]
impl ChainClient for DevChain {
    fn genesis_hash(&self) -> H256 {
        DEV_GENESIS_HASH
    }

    fn registry(&self) -> &dyn ErrorRegistry {
        &self.registry
    }

    fn create_transfer(&self, dest: &Ss58Address, amount: u64) -> Transaction {
        // balances.transfer(MultiAddress::Id(dest), Compact(amount))
        let mut method = vec![BALANCES_PALLET, TRANSFER_CALL, 0x00];
        method.extend_from_slice(dest.public_key());
        method.extend(compact_encode(amount.into()));

        Transaction {
            dest: *dest,
            amount,
            method,
        }
    }

    #[instrument(skip_all, err(Debug))]
    async fn sign_and_send(
        &self,
        tx: Transaction,
        sender: &Ss58Address,
        signer: &dyn Signer,
    ) -> Result<(LifecycleStream, Subscription)> {
        let nonce = self.next_nonce();
        let payload = SignerPayload {
            address: *sender,
            method: tx.method.clone(),
            nonce,
            genesis_hash: self.genesis_hash(),
        };
        let signed = signer.sign_payload(payload).await?;
        if signed.signature().is_empty() {
            return Err(ScanSignClientError::Submission(
                "transaction carries an empty signature".to_string(),
            ));
        }
        // The nonce was signed over, so it is only claimed if still unused.
        if self
            .next_nonce
            .compare_exchange(nonce, nonce + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ScanSignClientError::Submission(format!(
                "nonce {nonce} was used by another transaction"
            )));
        }
        info!(request_id = %signed.id(), nonce, "Transaction submitted to the dev chain.");

        let events = self.status_events(nonce, sender, &tx);
        let (status_tx, status_rx) = mpsc::channel(STATUS_BUFFER);
        let feeder = tokio::spawn(
            async move {
                for event in events {
                    // The receiver goes away once the watcher is done.
                    if status_tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
            .in_current_span(),
        );

        let released = Arc::clone(&self.released_subscriptions);
        let subscription = Subscription::new(move || {
            feeder.abort();
            let _ = released.fetch_add(1, Ordering::SeqCst);
        });

        Ok((Box::pin(ReceiverStream::new(status_rx)), subscription))
    }
}

fn balances_registry() -> StaticErrorRegistry {
    let balances = |error: u8, name: &'static str, doc: &'static str| {
        (
            ModuleError {
                index: BALANCES_PALLET,
                error,
            },
            ErrorMetadata::new("balances", name).with_documentation([doc]),
        )
    };

    [
        balances(0, "VestingBalance", "Vesting balance too high to send value"),
        balances(
            1,
            "LiquidityRestrictions",
            "Account liquidity restrictions prevent withdrawal",
        ),
        balances(2, "InsufficientBalance", "Balance too low to send value"),
        balances(
            3,
            "ExistentialDeposit",
            "Value too low to create account due to existential deposit",
        ),
        balances(4, "KeepAlive", "Transfer/payment would kill account"),
        balances(6, "DeadAccount", "Beneficiary account must pre-exist"),
    ]
    .into_iter()
    .fold(StaticErrorRegistry::new(), |registry, (error, metadata)| {
        registry.with_error(error, metadata)
    })
}
