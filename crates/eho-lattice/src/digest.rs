//! Fixed-layout 4096-byte export blob.
//!
//! | bytes       | content                                        |
//! |-------------|------------------------------------------------|
//! | 0..32       | SHA-256(identity)                              |
//! | 32..544     | 40 × f64 LE coordinate, zero padded            |
//! | 544..1056   | u16 LE length + JSON metadata (≤ 510 bytes)    |
//! | 1056..3648  | ML-DSA-87 public key of the identity           |
//! | 3648..3680  | SHA-256 over bytes 0..3648                     |
//! | 3680..4096  | zero                                           |

use std::ops::Range;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use eho_core::Coordinate;

use crate::error::Result;
use crate::keys::PUBLIC_KEY_LEN;
use crate::signer::LatticeSigner;

pub const DIGEST_LEN: usize = 4096;

const IDENTITY_HASH: Range<usize> = 0..32;
const COORDINATE_REGION: Range<usize> = 32..544;
const METADATA_REGION: Range<usize> = 544..1056;
const PUBLIC_KEY_REGION: Range<usize> = 1056..1056 + PUBLIC_KEY_LEN;
const INTEGRITY_TAG: Range<usize> = PUBLIC_KEY_REGION.end..PUBLIC_KEY_REGION.end + 32;

const METADATA_CAPACITY: usize = METADATA_REGION.end - METADATA_REGION.start - 2;

#[derive(Clone, PartialEq, Eq)]
pub struct LatticeDigest(Box<[u8; DIGEST_LEN]>);

impl LatticeDigest {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn len(&self) -> usize {
        DIGEST_LEN
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn identity_hash(&self) -> &[u8] {
        &self.0[IDENTITY_HASH]
    }

    pub fn coordinate(&self) -> Result<Coordinate> {
        let start = COORDINATE_REGION.start;
        Ok(Coordinate::from_le_bytes(&self.0[start..start + 320])?)
    }

    /// Raw metadata bytes as stored (possibly truncated JSON).
    pub fn metadata_bytes(&self) -> &[u8] {
        let region = &self.0[METADATA_REGION];
        let len = (u16::from_le_bytes([region[0], region[1]]) as usize).min(METADATA_CAPACITY);
        &region[2..2 + len]
    }

    /// Parsed metadata, `None` when it was truncated or absent.
    pub fn metadata(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(self.metadata_bytes()).ok()
    }

    pub fn public_key(&self) -> &[u8] {
        &self.0[PUBLIC_KEY_REGION]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

impl std::fmt::Debug for LatticeDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LatticeDigest({}…)", hex::encode(self.identity_hash()))
    }
}

impl LatticeSigner {
    pub fn create_lattice_digest(
        &self,
        identity: &str,
        coordinate: &Coordinate,
        metadata: &serde_json::Value,
    ) -> Result<LatticeDigest> {
        let keys = self.derive_key_pair(identity)?;
        let mut out = Box::new([0u8; DIGEST_LEN]);

        out[IDENTITY_HASH].copy_from_slice(&Sha256::digest(identity.as_bytes()));

        let coord = coordinate.to_le_bytes();
        out[COORDINATE_REGION.start..COORDINATE_REGION.start + coord.len()].copy_from_slice(&coord);

        let json = metadata.to_string();
        let json = &json.as_bytes()[..json.len().min(METADATA_CAPACITY)];
        let meta = METADATA_REGION.start;
        out[meta..meta + 2].copy_from_slice(&(json.len() as u16).to_le_bytes());
        out[meta + 2..meta + 2 + json.len()].copy_from_slice(json);

        out[PUBLIC_KEY_REGION].copy_from_slice(&keys.public_key);

        let tag = Sha256::digest(&out[..INTEGRITY_TAG.start]);
        out[INTEGRITY_TAG].copy_from_slice(&tag);

        Ok(LatticeDigest(out))
    }

    /// Re-check identity hash, integrity tag and embedded public key.
    /// Fails closed.
    pub fn verify_lattice_digest(&self, identity: &str, digest: &[u8]) -> bool {
        if digest.len() != DIGEST_LEN {
            return false;
        }
        let id_hash = Sha256::digest(identity.as_bytes());
        if !bool::from(digest[IDENTITY_HASH].ct_eq(id_hash.as_slice())) {
            return false;
        }
        let tag = Sha256::digest(&digest[..INTEGRITY_TAG.start]);
        if !bool::from(digest[INTEGRITY_TAG].ct_eq(tag.as_slice())) {
            return false;
        }
        if digest[INTEGRITY_TAG.end..].iter().any(|b| *b != 0) {
            return false;
        }
        match self.derive_key_pair(identity) {
            Ok(keys) => bool::from(digest[PUBLIC_KEY_REGION].ct_eq(&keys.public_key)),
            Err(e) => {
                tracing::warn!("digest check aborted for {identity}: {e}");
                false
            }
        }
    }
}
