/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Cryptographic primitives.
//!
//! The definitions and re-exports in this module provide two categories of cryptographic primitives:
//! 1. **Cryptographic Hashes**: provided by the [`sha2`] crate.
//! 2. **Digital Signatures**: the pluggable [`Signer`] trait, and an implementation of it,
//!    [`Ed25519Signer`], that is provided by the [`ed25519_dalek`] crate.

use borsh::BorshDeserialize;
use ed25519_dalek::Signer as _;

use super::{
    encoding::serialize,
    messages::{Envelope, SerializedIdentity},
};

// re-exports below.
pub use sha2::Digest;
pub use sha2::Sha256 as CryptoHasher;

pub use ed25519_dalek::{Signature, SignatureError, SigningKey, Verifier, VerifyingKey};

/// Compute the SHA256 hash of `data`.
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = CryptoHasher::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// An identity that can sign envelopes and configuration updates.
///
/// Implementations may hold key material in memory (like [`Ed25519Signer`]) or delegate to an external
/// wallet or hardware module.
pub trait Signer: Send + Sync {
    /// Get the identity that signatures produced by this signer can be verified against.
    fn serialized_identity(&self) -> SerializedIdentity;

    /// Sign an arbitrary `message`.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError>;
}

/// A facade around [`SigningKey`] that signs on behalf of a member of the membership service provider
/// `msp_id`.
///
/// The signer's identity bytes are its Ed25519 verifying key.
#[derive(Clone)]
pub struct Ed25519Signer {
    msp_id: String,
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Create an `Ed25519Signer` that wraps over `signing_key`.
    pub fn new(msp_id: impl Into<String>, signing_key: SigningKey) -> Ed25519Signer {
        Ed25519Signer {
            msp_id: msp_id.into(),
            signing_key,
        }
    }

    /// Get the `VerifyingKey` of this signer.
    pub fn public(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl Signer for Ed25519Signer {
    fn serialized_identity(&self) -> SerializedIdentity {
        SerializedIdentity {
            mspid: self.msp_id.clone(),
            id_bytes: self.public().to_bytes().to_vec(),
        }
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError> {
        Ok(self.signing_key.sign(message).to_bytes().to_vec())
    }
}

/// Check that `envelope.signature` is a valid signature by `verifying_key` over `envelope.payload`.
pub fn verify_envelope(envelope: &Envelope, verifying_key: &VerifyingKey) -> bool {
    match Signature::from_slice(&envelope.signature) {
        Ok(signature) => verifying_key.verify(&envelope.payload, &signature).is_ok(),
        Err(_) => false,
    }
}

/// Get the verifying key of an Ed25519 identity, as produced by [`Ed25519Signer::serialized_identity`], from the
/// serialized identity bytes of a signature header's `creator`.
pub fn ed25519_verifying_key(creator: &[u8]) -> Option<VerifyingKey> {
    let identity = SerializedIdentity::try_from_slice(creator).ok()?;
    let bytes: [u8; 32] = identity.id_bytes.as_slice().try_into().ok()?;
    VerifyingKey::from_bytes(&bytes).ok()
}

/// Serialize `identity` into the bytes stored in a signature header's `creator`.
pub(crate) fn serialize_identity(identity: &SerializedIdentity) -> Vec<u8> {
    serialize(identity)
}

/// Error from a [`Signer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("signer is unavailable: {0}")]
    Unavailable(String),

    #[error("signer refused to sign: {0}")]
    Refused(String),
}
