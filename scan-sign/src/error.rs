use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanSignError {
    // Exchange errors
    #[error("A signature request is already pending")]
    DoubleRequest,
    #[error("Received a signature but no request is pending")]
    UnexpectedSignature,
    #[error("No signature request is pending")]
    NothingPending,
    #[error("The signature request was abandoned by its requester")]
    RequestAbandoned,
    #[error("No signature was scanned within {0:?}")]
    SignatureTimeout(Duration),
    #[error("The signature request was cancelled")]
    RequestCancelled,

    // Decoding errors
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Payload of {0} bytes does not fit in the QR frame limit")]
    PayloadTooLarge(usize),

    // Wrapped errors
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
