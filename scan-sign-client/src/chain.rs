//! The seams between this crate and a chain client.
//!
//! A chain client owns transaction encoding, submission, and status
//! reporting. The only thing it needs from us is a [`Signer`].

use async_trait::async_trait;
use scan_sign::{
    lifecycle::{LifecycleStream, Subscription, H256},
    qr::compact_encode,
    registry::ErrorRegistry,
    ss58::Ss58Address,
    SignatureResult,
};

use crate::Result;

/// What a signer gets back to the chain client: the request id and the
/// signature exactly as scanned.
pub type SignerResult = SignatureResult;

/// The parts of a transaction that get signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerPayload {
    /// Account that has to sign.
    pub address: Ss58Address,
    /// Encoded call.
    pub method: Vec<u8>,
    pub nonce: u64,
    pub genesis_hash: H256,
}

impl SignerPayload {
    /// The bytes the signing device signs: `method ‖ compact(nonce) ‖ genesis hash`.
    pub fn encode(&self) -> Vec<u8> {
        let mut data = self.method.clone();
        data.extend(compact_encode(self.nonce.into()));
        data.extend_from_slice(&self.genesis_hash.0);
        data
    }
}

#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign_payload(&self, payload: SignerPayload) -> Result<SignerResult>;
}

/// An unsigned transaction built by a [`ChainClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub dest: Ss58Address,
    pub amount: u64,
    pub method: Vec<u8>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn genesis_hash(&self) -> H256;

    /// Metadata used to decode module errors reported by this chain.
    fn registry(&self) -> &dyn ErrorRegistry;

    fn create_transfer(&self, dest: &Ss58Address, amount: u64) -> Transaction;

    /// Have `signer` sign `tx` on behalf of `sender`, submit it, and return
    /// its status stream along with the subscription that feeds it.
    ///
    /// Fails with [`crate::ScanSignClientError::Submission`] if the
    /// transaction never makes it into the pool.
    async fn sign_and_send(
        &self,
        tx: Transaction,
        sender: &Ss58Address,
        signer: &dyn Signer,
    ) -> Result<(LifecycleStream, Subscription)>;
}
