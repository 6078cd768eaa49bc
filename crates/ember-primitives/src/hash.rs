//! 32-byte hash type.

use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use std::fmt;
use thiserror::Error;

/// Error parsing a hash from external input
#[derive(Debug, Error)]
pub enum HashError {
    /// Input was not valid hex
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Input had the wrong byte length
    #[error("invalid hash length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 32-byte hash.
///
/// Content identity for transactions and blocks (keccak-256 of the RLP
/// encoding), and the key of the pool's global transaction index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct H256([u8; 32]);

impl H256 {
    /// Hash length in bytes
    pub const LEN: usize = 32;

    /// The all-zero hash
    pub const ZERO: H256 = H256([0u8; 32]);

    /// Wrap a raw byte array
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        H256(bytes)
    }

    /// Copy from a slice, checking the length
    pub fn from_slice(slice: &[u8]) -> Result<Self, HashError> {
        if slice.len() != Self::LEN {
            return Err(HashError::InvalidLength(slice.len()));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(H256(bytes))
    }

    /// Parse from a hex string, with or without a `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| HashError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// View as raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the all-zero hash
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Lowercase hex string with a `0x` prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({})", self.to_hex())
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for H256 {
    fn from(bytes: [u8; 32]) -> Self {
        H256(bytes)
    }
}

impl AsRef<[u8]> for H256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Encodable for H256 {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.encoder().encode_value(&self.0);
    }
}

impl Decodable for H256 {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        rlp.decoder().decode_value(|bytes| {
            H256::from_slice(bytes).map_err(|_| DecoderError::RlpInvalidLength)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let h = H256::from_bytes([0xab; 32]);
        assert_eq!(H256::from_hex(&h.to_hex()).unwrap(), h);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(matches!(
            H256::from_slice(&[0u8; 31]),
            Err(HashError::InvalidLength(31))
        ));
    }

    #[test]
    fn test_zero_hash() {
        assert!(H256::ZERO.is_zero());
        assert!(!H256::from_bytes([1u8; 32]).is_zero());
    }

    #[test]
    fn test_rlp_roundtrip() {
        let h = H256::from_bytes([0x17; 32]);
        let encoded = rlp::encode(&h);
        let decoded: H256 = rlp::decode(&encoded).unwrap();
        assert_eq!(h, decoded);
    }
}
