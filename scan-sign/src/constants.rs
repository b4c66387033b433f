//! Constants that are shared between other crates in this workspace.
//! Crate-specific constants should go in their respective crates.

/// Request id attached to scanned signatures when the scanner doesn't supply
/// one.
pub const DEFAULT_REQUEST_ID: u64 = 1;

/// Square size, in pixels, used by QR display surfaces unless configured.
pub const DEFAULT_QR_SIZE: u32 = 300;

pub mod qr {
    /// Marks a payload as addressed to a Substrate-style signer.
    pub const SUBSTRATE_ID: u8 = 0x53;
    pub const CRYPTO_SR25519: u8 = 0x01;

    pub const CMD_SIGN_TX: u8 = 0x00;
    pub const CMD_SIGN_TX_HASH: u8 = 0x01;
    pub const CMD_SIGN_IMMORTAL_TX: u8 = 0x02;
    pub const CMD_SIGN_MSG: u8 = 0x03;

    /// Maximum number of payload bytes carried by a single QR frame.
    pub const FRAME_SIZE: usize = 1024;
    pub const MULTIPART: u8 = 0x00;
    /// Frame count and index are encoded as big-endian `u16`s.
    pub const MAX_FRAMES: usize = u16::MAX as usize;
}

pub mod span_fields {
    pub const SUBMISSION_ID: &str = "submission_id";
    pub const REQUEST_ID: &str = "request_id";
}
