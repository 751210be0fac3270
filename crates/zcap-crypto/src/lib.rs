//! Ed25519 signing and verification over arbitrary byte strings.
//!
//! This is the only signature suite the `Ed25519Signature2020` Data
//! Integrity cryptosuite needs. Keys are always the raw 32-byte forms;
//! signatures are always the raw 64-byte form -- no DER, no PEM.

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length, in bytes, of a raw Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;
/// Length, in bytes, of a raw Ed25519 private (signing) key seed.
pub const PRIVATE_KEY_LEN: usize = 32;
/// Length, in bytes, of an Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// Fatal errors at sign time: a structurally impossible key, never "bad
/// signature" (verification failures return `false`, they never throw).
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid private key: expected {PRIVATE_KEY_LEN} bytes, got {0}")]
    InvalidPrivateKeyLength(usize),

    #[error("invalid public key: expected {PUBLIC_KEY_LEN} bytes, got {0}")]
    InvalidPublicKeyLength(usize),

    #[error("malformed public key bytes")]
    MalformedPublicKey,
}

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Private key material, zeroed on drop. Not `Clone` -- copying raw
/// signing key bytes should always be a deliberate, visible operation.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; PRIVATE_KEY_LEN]);

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; PRIVATE_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPrivateKeyLength(bytes.len()))?;
        Ok(Self(arr))
    }

    fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.0)
    }

    /// The public key corresponding to this private key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key().verifying_key().to_bytes())
    }
}

/// A public (verifying) key, 32 raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; PUBLIC_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKeyLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    fn verifying_key(&self) -> std::result::Result<VerifyingKey, CryptoError> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::MalformedPublicKey)
    }
}

/// An Ed25519 keypair.
pub struct KeyPair {
    pub private: PrivateKey,
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new keypair using a cryptographically secure RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        let public = PublicKey(signing_key.verifying_key().to_bytes());
        let private = PrivateKey(signing_key.to_bytes());
        Self { private, public }
    }

    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self> {
        let private = PrivateKey::from_bytes(bytes)?;
        let public = private.public_key();
        Ok(Self { private, public })
    }
}

/// Sign `msg` with the given private key, producing a 64-byte signature.
pub fn sign(msg: &[u8], sk: &PrivateKey) -> [u8; SIGNATURE_LEN] {
    sk.signing_key().sign(msg).to_bytes()
}

/// Verify a signature over `msg` under the given public key.
///
/// Never throws for a bad signature or a bad signature length -- those
/// simply return `false`. Only a structurally impossible public key
/// (wrong byte length, or bytes that do not decode to a curve point)
/// is an error.
pub fn verify(msg: &[u8], sig: &[u8], pk: &PublicKey) -> Result<bool> {
    let Ok(sig_arr): std::result::Result<[u8; SIGNATURE_LEN], _> = sig.try_into() else {
        return Ok(false);
    };
    let verifying_key = pk.verifying_key()?;
    let signature = ed25519_dalek::Signature::from_bytes(&sig_arr);
    Ok(verifying_key.verify(msg, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let kp = KeyPair::generate();
        let msg = b"capability delegation payload";
        let sig = sign(msg, &kp.private);
        assert!(verify(msg, &sig, &kp.public).unwrap());
    }

    #[test]
    fn tampered_message_fails() {
        let kp = KeyPair::generate();
        let msg = b"capability delegation payload";
        let mut sig = sign(msg, &kp.private);
        let mut tampered = *msg;
        tampered[0] ^= 0x01;
        assert!(!verify(&tampered, &sig, &kp.public).unwrap());

        sig[0] ^= 0x01;
        assert!(!verify(msg, &sig, &kp.public).unwrap());
    }

    #[test]
    fn wrong_length_signature_is_false_not_error() {
        let kp = KeyPair::generate();
        let short_sig = [0u8; 10];
        assert!(!verify(b"anything", &short_sig, &kp.public).unwrap());
    }

    #[test]
    fn malformed_public_key_never_panics() {
        // All-0xff does not decompress to a valid Edwards point; verification
        // must report this as a `CryptoError`, never panic and never silently
        // treat it as a valid-but-failing signature.
        let pk = PublicKey([0xffu8; 32]);
        match verify(b"x", &[0u8; 64], &pk) {
            Err(CryptoError::MalformedPublicKey) => {}
            Ok(false) => {}
            other => panic!("unexpected result for malformed key: {other:?}"),
        }
    }

    #[test]
    fn invalid_key_lengths_are_fatal_at_construction() {
        assert!(matches!(
            PrivateKey::from_bytes(&[0u8; 10]),
            Err(CryptoError::InvalidPrivateKeyLength(10))
        ));
        assert!(matches!(
            PublicKey::from_bytes(&[0u8; 31]),
            Err(CryptoError::InvalidPublicKeyLength(31))
        ));
    }

    #[test]
    fn deterministic_from_seed() {
        let kp1 = KeyPair::from_private_bytes(&[1u8; 32]).unwrap();
        let kp2 = KeyPair::from_private_bytes(&[1u8; 32]).unwrap();
        assert_eq!(kp1.public.as_bytes(), kp2.public.as_bytes());
    }
}
