//! Identity-bound ML-DSA-87 key material.
//!
//! Keys are never stored here. A [`KeySource`] hands out a 32-byte seed per
//! identity and the key pair is expanded from it on demand, so the same
//! identity always yields bit-identical keys.

use std::fmt;

use fips204::ml_dsa_87;
use fips204::traits::{KeyGen, SerDes};
use sha2::{Digest, Sha256};

use eho_core::time::now_iso8601;

use crate::error::{LatticeError, Result};

pub const ALGORITHM: &str = "ML-DSA-87";
pub const PUBLIC_KEY_LEN: usize = ml_dsa_87::PK_LEN;
pub const PRIVATE_KEY_LEN: usize = ml_dsa_87::SK_LEN;

const KEY_DERIVATION_TAG: &[u8] = b"eho-lattice/mldsa87/v1";

/// Supplies per-identity key seeds. A secrets vault implements this and
/// refuses with [`LatticeError::IdentityDerivation`].
pub trait KeySource: Send + Sync {
    fn seed(&self, identity: &str) -> Result<[u8; 32]>;
}

/// Seeds re-derived as SHA-256(tag ‖ identity).
#[derive(Clone, Copy, Debug, Default)]
pub struct DerivedSeeds;

impl KeySource for DerivedSeeds {
    fn seed(&self, identity: &str) -> Result<[u8; 32]> {
        if identity.is_empty() {
            return Err(LatticeError::IdentityDerivation {
                identity: String::new(),
                reason: "identity is empty".to_string(),
            });
        }
        let mut hasher = Sha256::new();
        hasher.update(KEY_DERIVATION_TAG);
        hasher.update(identity.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&hasher.finalize());
        Ok(seed)
    }
}

/// Expanded key pair for one identity.
#[derive(Clone)]
pub struct KeyPair {
    pub public_key: Vec<u8>,
    private_key: Vec<u8>,
    pub algorithm: String,
    pub identity: String,
    pub created_at: String,
}

impl KeyPair {
    pub(crate) fn expand(identity: &str, seed: &[u8; 32]) -> Self {
        let (pk, sk) = ml_dsa_87::KG::keygen_from_seed(seed);
        Self {
            public_key: pk.into_bytes().to_vec(),
            private_key: sk.into_bytes().to_vec(),
            algorithm: ALGORITHM.to_string(),
            identity: identity.to_string(),
            created_at: now_iso8601(),
        }
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// SHA-256 of the public key bytes.
    pub fn fingerprint(&self) -> [u8; 32] {
        fingerprint(&self.public_key)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("identity", &self.identity)
            .field("algorithm", &self.algorithm)
            .field("public_key", &format_args!("{}…", hex::encode(&self.public_key[..8])))
            .field("private_key", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

pub(crate) fn fingerprint(public_key: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(public_key));
    out
}
