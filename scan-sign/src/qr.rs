//! Framing of payloads for QR display and parsing of scanned signatures.
//!
//! This covers the bytes that go into a QR code and the text that comes out
//! of a scan. Rendering the code and decoding camera frames is left to the
//! display and scan surfaces.

use serde::{Deserialize, Serialize};

use crate::{
    constants::qr::{
        CMD_SIGN_IMMORTAL_TX, CMD_SIGN_MSG, CMD_SIGN_TX, CMD_SIGN_TX_HASH, CRYPTO_SR25519,
        FRAME_SIZE, MAX_FRAMES, MULTIPART, SUBSTRATE_ID,
    },
    lifecycle::H256,
    ss58::Ss58Address,
    Result, ScanSignError,
};

/// What the signing device is asked to do with the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignCommand {
    SignTx,
    SignTxHash,
    SignImmortalTx,
    SignMessage,
}

impl SignCommand {
    pub fn as_byte(&self) -> u8 {
        match self {
            SignCommand::SignTx => CMD_SIGN_TX,
            SignCommand::SignTxHash => CMD_SIGN_TX_HASH,
            SignCommand::SignImmortalTx => CMD_SIGN_IMMORTAL_TX,
            SignCommand::SignMessage => CMD_SIGN_MSG,
        }
    }
}

/// A payload together with the addressing and command metadata the signing
/// device needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignPayload {
    pub address: Ss58Address,
    pub command: SignCommand,
    /// Payload bytes as they go into the QR, i.e. already length-prefixed
    /// where the command requires it.
    pub payload: Vec<u8>,
    pub genesis_hash: H256,
}

impl SignPayload {
    /// `SUBSTRATE_ID ‖ CRYPTO_SR25519 ‖ command ‖ public key ‖ payload ‖ genesis hash`
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(3 + 32 + self.payload.len() + 32);
        data.push(SUBSTRATE_ID);
        data.push(CRYPTO_SR25519);
        data.push(self.command.as_byte());
        data.extend_from_slice(self.address.public_key());
        data.extend_from_slice(&self.payload);
        data.extend_from_slice(&self.genesis_hash.0);
        data
    }

    /// Encoded payload split into displayable frames.
    pub fn frames(&self) -> Result<Vec<Vec<u8>>> {
        encode_frames(&self.encode())
    }
}

/// Split `data` into frames of at most [`FRAME_SIZE`] bytes, each prefixed
/// with `MULTIPART ‖ u16be(frame count) ‖ u16be(frame index)`.
pub fn encode_frames(data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let chunks: Vec<&[u8]> = if data.is_empty() {
        vec![data]
    } else {
        data.chunks(FRAME_SIZE).collect()
    };
    if chunks.len() > MAX_FRAMES {
        return Err(ScanSignError::PayloadTooLarge(data.len()));
    }

    let count = chunks.len() as u16;
    let frames = chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            let mut frame = Vec::with_capacity(5 + chunk.len());
            frame.push(MULTIPART);
            frame.extend_from_slice(&count.to_be_bytes());
            frame.extend_from_slice(&(index as u16).to_be_bytes());
            frame.extend_from_slice(chunk);
            frame
        })
        .collect();
    Ok(frames)
}

/// Prefix `payload` with its SCALE compact-encoded length, as signing devices
/// expect for transaction payloads sent over QR.
pub fn compact_length_prefixed(payload: &[u8]) -> Vec<u8> {
    let mut data = compact_encode(payload.len() as u128);
    data.extend_from_slice(payload);
    data
}

/// SCALE compact encoding of an unsigned integer.
pub fn compact_encode(value: u128) -> Vec<u8> {
    if value < 0x40 {
        vec![(value << 2) as u8]
    } else if value < 0x4000 {
        (((value << 2) | 0b01) as u16).to_le_bytes().to_vec()
    } else if value < 0x4000_0000 {
        (((value << 2) | 0b10) as u32).to_le_bytes().to_vec()
    } else {
        let bytes_needed = (128 - value.leading_zeros() + 7) / 8;
        let mut data = vec![(((bytes_needed - 4) << 2) | 0b11) as u8];
        data.extend((0..bytes_needed).map(|i| (value >> (8 * i)) as u8));
        data
    }
}

/// Decode the text produced by scanning a signature QR.
///
/// Accepts hex with or without a `0x` prefix.
pub fn parse_scanned_signature(data: &str) -> Result<Vec<u8>> {
    let data = data.trim();
    let hex_str = data
        .strip_prefix("0x")
        .or_else(|| data.strip_prefix("0X"))
        .unwrap_or(data);
    if hex_str.is_empty() {
        return Err(ScanSignError::InvalidSignature("empty scan".to_string()));
    }

    hex::decode(hex_str).map_err(|e| ScanSignError::InvalidSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_payload(payload: Vec<u8>) -> SignPayload {
        SignPayload {
            address: Ss58Address::new([0x11; 32], 2),
            command: SignCommand::SignTx,
            payload,
            genesis_hash: H256([0x22; 32]),
        }
    }

    #[test]
    fn sign_payload_layout() {
        let encoded = sign_payload(vec![0xde, 0xad]).encode();

        assert_eq!(&encoded[..3], &[SUBSTRATE_ID, CRYPTO_SR25519, CMD_SIGN_TX]);
        assert_eq!(&encoded[3..35], &[0x11; 32]);
        assert_eq!(&encoded[35..37], &[0xde, 0xad]);
        assert_eq!(&encoded[37..], &[0x22; 32]);
    }

    #[test]
    fn small_payload_is_one_frame() {
        let frames = sign_payload(vec![1, 2, 3]).frames().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..5], &[MULTIPART, 0, 1, 0, 0]);
    }

    #[test]
    fn large_payload_is_split() {
        let data = vec![0xab; FRAME_SIZE * 2 + 10];
        let frames = encode_frames(&data).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(&frames[2][..5], &[MULTIPART, 0, 3, 0, 2]);
        assert_eq!(frames[2].len(), 5 + 10);
        let rejoined: Vec<u8> = frames.iter().flat_map(|f| f[5..].to_vec()).collect();
        assert_eq!(rejoined, data);
    }

    #[test]
    fn compact_encoding_modes() {
        assert_eq!(compact_encode(0), vec![0x00]);
        assert_eq!(compact_encode(63), vec![0xfc]);
        assert_eq!(compact_encode(64), vec![0x01, 0x01]);
        assert_eq!(compact_encode(16_383), vec![0xfd, 0xff]);
        assert_eq!(compact_encode(16_384), vec![0x02, 0x00, 0x01, 0x00]);
        assert_eq!(compact_encode(1 << 30), vec![0x03, 0x00, 0x00, 0x00, 0x40]);
        assert_eq!(compact_length_prefixed(&[9, 9, 9]), vec![0x0c, 9, 9, 9]);
    }

    #[test]
    fn scanned_signature_parsing() {
        assert_eq!(parse_scanned_signature("0xaabb").unwrap(), vec![0xaa, 0xbb]);
        assert_eq!(parse_scanned_signature(" AABB\n").unwrap(), vec![0xaa, 0xbb]);
        assert!(matches!(
            parse_scanned_signature("0x"),
            Err(ScanSignError::InvalidSignature(_))
        ));
        assert!(parse_scanned_signature("0xzz").is_err());
        assert!(parse_scanned_signature("abc").is_err());
    }
}
