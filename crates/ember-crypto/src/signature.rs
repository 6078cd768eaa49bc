//! ECDSA signatures over secp256k1 with public-key recovery.

use crate::{keccak256, CryptoError};
use ember_primitives::{Address, H256};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};

/// Signing key (32 bytes)
pub type PrivateKey = SigningKey;

/// Verifying key
pub type PublicKey = VerifyingKey;

/// A recoverable ECDSA signature in `r || s || v` form.
///
/// `v` is stored as 27/28 in wire-compatible fashion; only low-s signatures
/// are accepted on recovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    /// r scalar, big-endian
    pub r: [u8; 32],
    /// s scalar, big-endian
    pub s: [u8; 32],
    /// recovery id, 27 or 28
    pub v: u8,
}

impl Signature {
    /// Assemble from components.
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Signature { r, s, v }
    }

    /// Recovery id normalized to 0/1.
    pub fn recovery_id(&self) -> u8 {
        if self.v >= 27 {
            self.v - 27
        } else {
            self.v
        }
    }

    /// A signature with zero `r` or `s` can never verify; used as the
    /// cheap "is this transaction signed at all" check.
    pub fn is_present(&self) -> bool {
        self.r != [0u8; 32] && self.s != [0u8; 32]
    }

    /// Serialize to the 65-byte `r || s || v` layout.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    fn to_ecdsa(self) -> Result<EcdsaSignature, CryptoError> {
        EcdsaSignature::from_scalars(self.r, self.s)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))
    }
}

/// Derive the address of a public key: the low 20 bytes of the keccak-256
/// of the uncompressed point (without the 0x04 tag byte).
pub fn public_key_to_address(key: &PublicKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest.as_bytes()[12..]);
    Address::from_bytes(out)
}

/// Sign a 32-byte message hash, producing a low-s recoverable signature.
pub fn sign(message_hash: &H256, key: &PrivateKey) -> Result<Signature, CryptoError> {
    let (mut sig, mut recovery_id) = key
        .sign_prehash_recoverable(message_hash.as_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    // Enforce low-s; flipping s flips the recovery parity
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recovery_id = RecoveryId::try_from(recovery_id.to_byte() ^ 1)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    }

    Ok(Signature {
        r: sig.r().to_bytes().into(),
        s: sig.s().to_bytes().into(),
        v: recovery_id.to_byte() + 27,
    })
}

/// Recover the signer address from a message hash and signature.
///
/// High-s signatures are rejected to keep transaction hashes non-malleable.
pub fn recover(message_hash: &H256, signature: &Signature) -> Result<Address, CryptoError> {
    let ecdsa = signature.to_ecdsa()?;
    if ecdsa.normalize_s().is_some() {
        return Err(CryptoError::InvalidSignature("high-s signature".into()));
    }
    let recovery_id = RecoveryId::from_byte(signature.recovery_id())
        .ok_or(CryptoError::InvalidRecoveryId(signature.v))?;
    let key = VerifyingKey::recover_from_prehash(message_hash.as_bytes(), &ecdsa, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    Ok(public_key_to_address(&key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn random_key() -> PrivateKey {
        SigningKey::random(&mut OsRng)
    }

    #[test]
    fn test_sign_recover_roundtrip() {
        let key = random_key();
        let expected = public_key_to_address(key.verifying_key());
        let hash = keccak256(b"payload");

        let sig = sign(&hash, &key).unwrap();
        assert_eq!(recover(&hash, &sig).unwrap(), expected);
    }

    #[test]
    fn test_recover_wrong_hash_gives_wrong_signer() {
        let key = random_key();
        let expected = public_key_to_address(key.verifying_key());
        let sig = sign(&keccak256(b"one"), &key).unwrap();

        let recovered = recover(&keccak256(b"two"), &sig);
        assert!(recovered.is_err() || recovered.unwrap() != expected);
    }

    #[test]
    fn test_signatures_are_low_s() {
        let key = random_key();
        for i in 0u8..16 {
            let sig = sign(&keccak256([i]), &key).unwrap();
            assert!(sig.to_ecdsa().unwrap().normalize_s().is_none());
        }
    }

    #[test]
    fn test_zero_signature_is_not_present() {
        let sig = Signature::new([0u8; 32], [0u8; 32], 27);
        assert!(!sig.is_present());
        let sig = Signature::new([1u8; 32], [2u8; 32], 27);
        assert!(sig.is_present());
    }

    #[test]
    fn test_invalid_recovery_id_rejected() {
        let key = random_key();
        let hash = keccak256(b"x");
        let mut sig = sign(&hash, &key).unwrap();
        sig.v = 99;
        assert!(matches!(
            recover(&hash, &sig),
            Err(CryptoError::InvalidRecoveryId(99))
        ));
    }
}
