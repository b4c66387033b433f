//! Shared types, protocols, and infrastructure for the scan-to-sign workflow.
//!
//! A transaction that needs a signature hands its unsigned payload to an
//! out-of-band signer through a QR display. The signature comes back through
//! a QR scan and resolves the pending request held by a
//! [`SignatureExchange`]. This crate holds the exchange state machine, the
//! transaction lifecycle events produced by a chain client, dispatch-error
//! decoding, and the QR payload framing. It is used by `scan-sign-client` and
//! the `scan-sign-cli` demo.
#![warn(unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(rustdoc::broken_intra_doc_links)]

pub mod constants;
pub mod error;
pub mod exchange;
pub mod infrastructure;
pub mod lifecycle;
pub mod qr;
pub mod registry;
pub mod ss58;
pub mod types;

pub use error::ScanSignError;
pub use exchange::{ExchangePolicy, ExchangeStatus, PendingSignature, SignatureExchange};
pub use types::{RequestId, SignatureResult};

pub type Result<T> = std::result::Result<T, ScanSignError>;
