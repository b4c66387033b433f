//! Utilities for our logging (tracing) infrastructure.

use std::fmt::Debug;
use tracing::{warn, Span};

/// For the current active span, record `field_value` for the field
/// `field_name`. This fields must already be defined in the current span.
///
/// All events that happen inside this span will have these fields attached as
/// additional data.
///
/// For example:
/// ```text
///   2026-10-19T09:12:44.310605Z  INFO scan_sign::exchange: Signature requested. payload_len=142
///     at scan-sign/src/exchange.rs:171
///     in scan_sign_client::client::submit_transfer with submission_id: "9cb5e6fe-aa86-43e9-b7c9-413c005cbb50"
/// ```
/// We can see here the `submit_transfer` span has the field "submission_id".
///
/// If running on development mode, this function will check if the field has
/// NOT been defined and log a warning.
///
///  Note: We use dynamic dispatch for the `field_value` argument as we expect
/// lots of types to call this function.
pub fn record_field(field_name: &str, field_value: &dyn Debug) {
    if cfg!(debug_assertions) && !Span::current().has_field(field_name) {
        warn!("Field {} not defined in current span!", field_name);
    }

    // Ignore the resulting span.
    let _ = Span::current().record(field_name, &format!("{field_value:?}"));
}

/// Hex-encode bytes for log output, with the `0x` prefix chain tooling
/// expects.
pub fn hex_field(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
