use scan_sign::{registry::DescribedDispatchError, ScanSignError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanSignClientError {
    #[error("Transaction rejected before entering the pool: {0}")]
    Submission(String),
    #[error("Transaction included but dispatch failed: {0}")]
    Dispatch(DescribedDispatchError),
    #[error("Transaction did not make it into a block: {0}")]
    NotIncluded(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    // Wrapped errors
    #[error(transparent)]
    ScanSign(#[from] ScanSignError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
