//! Keccak-256 hashing

use ember_primitives::H256;
use sha3::{Digest, Keccak256};

/// Compute the keccak-256 digest of `data`.
pub fn keccak256(data: impl AsRef<[u8]>) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    H256::from_bytes(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty() {
        // Well-known digest of the empty string
        assert_eq!(
            keccak256(b"").to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak256_is_deterministic() {
        assert_eq!(keccak256(b"ember"), keccak256(b"ember"));
        assert_ne!(keccak256(b"ember"), keccak256(b"embers"));
    }
}
