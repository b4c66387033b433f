//! Client side of the scan-to-sign workflow.
//!
//! [`ScanSignClient`] builds a transfer, has a [`chain::ChainClient`] sign it
//! through the QR [`signer::QrSigner`], and follows the resulting transaction
//! lifecycle to completion. [`dev_chain::DevChain`] stands in for a real node
//! so the whole flow can run in-process.
#![warn(unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(rustdoc::broken_intra_doc_links)]

pub mod chain;
pub mod client;
pub mod config;
pub mod dev_chain;
pub mod error;
pub mod signer;

pub use client::ScanSignClient;
pub use config::Config;
pub use error::ScanSignClientError;

pub type Result<T> = std::result::Result<T, ScanSignClientError>;
