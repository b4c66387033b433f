//! Values passed between the submission flow, the exchange, and the scan
//! surface.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

use crate::{constants::DEFAULT_REQUEST_ID, ScanSignError};

/// Opaque identifier that accompanies a scanned signature back to the chain
/// client. The exchange never interprets it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self(DEFAULT_REQUEST_ID)
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for RequestId {
    type Err = ScanSignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| ScanSignError::InvalidSignature(format!("bad request id {s:?}: {e}")))
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signature as delivered by the scan surface, paired with its request id.
///
/// Immutable once constructed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureResult {
    id: RequestId,
    signature: Vec<u8>,
}

impl SignatureResult {
    pub fn new(id: RequestId, signature: Vec<u8>) -> Self {
        Self { id, signature }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn into_parts(self) -> (RequestId, Vec<u8>) {
        (self.id, self.signature)
    }
}

impl Debug for SignatureResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureResult")
            .field("id", &self.id)
            .field("signature", &format!("0x{}", hex::encode(&self.signature)))
            .finish()
    }
}
