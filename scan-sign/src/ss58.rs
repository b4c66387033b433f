//! SS58 account addresses.
//!
//! The QR display needs the sender's raw public key; addresses in config are
//! SS58 strings. See <https://docs.substrate.io/reference/address-formats/>.

use blake2::{Blake2b512, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

use crate::ScanSignError;

const SS58_PREFIX: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;

/// Network prefix used by Kusama addresses.
pub const KUSAMA_PREFIX: u16 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ss58Address {
    public_key: [u8; 32],
    prefix: u16,
}

impl Ss58Address {
    pub fn new(public_key: [u8; 32], prefix: u16) -> Self {
        Self { public_key, prefix }
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    pub fn prefix(&self) -> u16 {
        self.prefix
    }
}

impl FromStr for Ss58Address {
    type Err = ScanSignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ScanSignError::InvalidAddress(format!("{s}: {reason}"));

        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| invalid(&e.to_string()))?;

        let (prefix, prefix_len) = match bytes.first() {
            Some(&first) if first < 64 => (first as u16, 1),
            Some(&first) if first < 128 => {
                let second = *bytes.get(1).ok_or_else(|| invalid("truncated prefix"))?;
                // Two-byte prefixes pack 14 bits across both bytes.
                let lower = ((first & 0x3f) << 2) as u16 | (second >> 6) as u16;
                let upper = (second & 0x3f) as u16;
                (lower | (upper << 8), 2)
            }
            Some(_) => return Err(invalid("reserved prefix")),
            None => return Err(invalid("empty")),
        };

        let key_end = prefix_len + 32;
        if bytes.len() != key_end + CHECKSUM_LEN {
            return Err(invalid("wrong length"));
        }
        if bytes[key_end..] != checksum(&bytes[..key_end]) {
            return Err(invalid("bad checksum"));
        }

        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(&bytes[prefix_len..key_end]);
        Ok(Self { public_key, prefix })
    }
}

impl Display for Ss58Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut data = Vec::with_capacity(2 + 32 + CHECKSUM_LEN);
        if self.prefix < 64 {
            data.push(self.prefix as u8);
        } else {
            data.push((((self.prefix & 0x00fc) >> 2) | 0x40) as u8);
            data.push(((self.prefix >> 8) | ((self.prefix & 0x0003) << 6)) as u8);
        }
        data.extend_from_slice(&self.public_key);
        let checksum = checksum(&data);
        data.extend_from_slice(&checksum);

        f.write_str(&bs58::encode(data).into_string())
    }
}

impl Debug for Ss58Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ss58Address({self})")
    }
}

impl Serialize for Ss58Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ss58Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// First two bytes of `Blake2b-512("SS58PRE" ‖ data)`.
fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(data);
    let hash = hasher.finalize();
    [hash[0], hash[1]]
}
