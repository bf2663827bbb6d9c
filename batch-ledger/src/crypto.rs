//! Cryptographic operations for the ledger
//!
//! This module provides:
//! - Ed25519 key pair generation, signing, and verification
//! - SHA-256 hashing for batch content and event records
//! - Verification of the hash-chained event log

use crate::{events::EventRecord, types::Signature, Error, Result};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// Ed25519 key pair used to sign event records
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Get public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signature = self.signing_key.sign(message);
        Signature::from_bytes(signature.to_bytes())
    }

    /// Verify a signature
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let dalek_sig = DalekSignature::from_bytes(signature.as_bytes());
        self.verifying_key
            .verify(message, &dalek_sig)
            .map_err(|e| Error::Signature(format!("Verification failed: {}", e)))
    }
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Verify a contiguous run of event records.
///
/// Checks that every record's hash matches its contents, that each record
/// links to its predecessor, and that a run starting at sequence 1 chains
/// from the genesis hash. With a public key, every record must also carry a
/// valid signature over its hash.
pub fn verify_event_chain(records: &[EventRecord], public_key: Option<&[u8; 32]>) -> Result<()> {
    let mut previous: Option<&EventRecord> = None;

    for record in records {
        if record.compute_hash()? != record.hash {
            return Err(Error::Signature(format!(
                "event {} hash mismatch",
                record.sequence
            )));
        }

        match previous {
            Some(prev) => {
                if record.sequence != prev.sequence + 1 || record.previous_hash != prev.hash {
                    return Err(Error::Signature(format!(
                        "event {} does not follow event {}",
                        record.sequence, prev.sequence
                    )));
                }
            }
            None if record.sequence == 1 => {
                if record.previous_hash != crate::events::GENESIS_HASH {
                    return Err(Error::Signature(
                        "first event does not chain from genesis".to_string(),
                    ));
                }
            }
            None => {}
        }

        if let Some(key) = public_key {
            let signed = record
                .signature
                .as_ref()
                .map(|signature| signature.verify(&record.hash, key))
                .unwrap_or(false);
            if !signed {
                return Err(Error::Signature(format!(
                    "event {} has no valid signature",
                    record.sequence
                )));
            }
        }

        previous = Some(record);
    }

    Ok(())
}
