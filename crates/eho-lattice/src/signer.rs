use std::sync::Arc;

use fips204::ml_dsa_87;
use fips204::traits::{KeyGen, SerDes, Signer, Verifier};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use eho_core::time::now_iso8601;
use eho_core::{Coordinate, EPSILON};

use crate::error::{LatticeError, Result};
use crate::keys::{ALGORITHM, DerivedSeeds, KeyPair, KeySource, fingerprint};

pub const SIGNATURE_LEN: usize = ml_dsa_87::SIG_LEN;

const MESSAGE_TAG: &[u8] = b"eho-coord/v1";
const CONTEXT: &[u8] = b"eho-memory";

/// A detached signature over one coordinate snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
    /// Exactly the coordinate that was signed.
    pub coordinate: Coordinate,
    pub identity: String,
    pub timestamp: String,
    pub algorithm: String,
    /// SHA-256 of the signer's public key.
    #[serde(with = "hex_bytes")]
    pub key_fingerprint: Vec<u8>,
}

/// Outcome counts of a verification sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub verified: usize,
    pub failed: usize,
}

/// Signs and verifies coordinates under identity-bound ML-DSA-87 keys.
#[derive(Clone)]
pub struct LatticeSigner {
    source: Arc<dyn KeySource>,
}

impl Default for LatticeSigner {
    fn default() -> Self {
        Self::new(DerivedSeeds)
    }
}

impl LatticeSigner {
    pub fn new(source: impl KeySource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn derive_key_pair(&self, identity: &str) -> Result<KeyPair> {
        let seed = self.source.seed(identity)?;
        Ok(KeyPair::expand(identity, &seed))
    }

    pub fn sign(&self, identity: &str, coordinate: &Coordinate) -> Result<Signature> {
        let seed = self.source.seed(identity)?;
        let (pk, sk) = ml_dsa_87::KG::keygen_from_seed(&seed);
        let message = signing_message(identity, coordinate);
        let bytes = sk
            .try_sign(&message, CONTEXT)
            .map_err(|e| LatticeError::Signing(e.to_string()))?;
        tracing::debug!(identity, "signed coordinate");
        Ok(Signature {
            bytes: bytes.to_vec(),
            coordinate: *coordinate,
            identity: identity.to_string(),
            timestamp: now_iso8601(),
            algorithm: ALGORITHM.to_string(),
            key_fingerprint: fingerprint(&pk.into_bytes()).to_vec(),
        })
    }

    /// Sign a raw component slice, rejecting anything that is not 40 long.
    pub fn sign_slice(&self, identity: &str, values: &[f64]) -> Result<Signature> {
        let coordinate = Coordinate::from_slice(values)?;
        self.sign(identity, &coordinate)
    }

    /// Fails closed: every mismatch and every error resolves to `false`.
    pub fn verify(&self, signature: &Signature, coordinate: &Coordinate) -> bool {
        self.try_verify(signature, coordinate).unwrap_or_else(|e| {
            tracing::warn!("verification aborted for {}: {e}", signature.identity);
            false
        })
    }

    pub fn verify_slice(&self, signature: &Signature, values: &[f64]) -> bool {
        match Coordinate::from_slice(values) {
            Ok(coordinate) => self.verify(signature, &coordinate),
            Err(_) => false,
        }
    }

    /// Like [`LatticeSigner::verify`], but a key source refusal is an error
    /// rather than `false`.
    pub fn try_verify(&self, signature: &Signature, coordinate: &Coordinate) -> Result<bool> {
        if !signature.coordinate.approx_eq(coordinate, EPSILON) {
            return Ok(false);
        }
        if signature.algorithm != ALGORITHM {
            return Ok(false);
        }
        let Ok(sig_bytes) = <[u8; SIGNATURE_LEN]>::try_from(signature.bytes.as_slice()) else {
            return Ok(false);
        };

        let seed = self.source.seed(&signature.identity)?;
        let (pk, _) = ml_dsa_87::KG::keygen_from_seed(&seed);
        let pk_bytes = pk.into_bytes();
        let expected = fingerprint(&pk_bytes);
        if !bool::from(expected.as_slice().ct_eq(&signature.key_fingerprint)) {
            return Ok(false);
        }
        let Ok(pk) = ml_dsa_87::PublicKey::try_from_bytes(pk_bytes) else {
            return Ok(false);
        };

        let message = signing_message(&signature.identity, &signature.coordinate);
        Ok(pk.verify(&message, &sig_bytes, CONTEXT))
    }

    /// Verify every pair, counting outcomes instead of stopping at the first failure.
    pub fn verify_batch(&self, items: &[(Signature, Coordinate)]) -> BatchReport {
        let mut report = BatchReport::default();
        for (signature, coordinate) in items {
            if self.verify(signature, coordinate) {
                report.verified += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }
}

/// Canonical byte image signed for `coordinate` under `identity`.
pub fn signing_message(identity: &str, coordinate: &Coordinate) -> Vec<u8> {
    let id = identity.as_bytes();
    let coord = coordinate.to_le_bytes();
    let mut out = Vec::with_capacity(MESSAGE_TAG.len() + 4 + id.len() + coord.len());
    out.extend_from_slice(MESSAGE_TAG);
    out.extend_from_slice(&(id.len() as u32).to_le_bytes());
    out.extend_from_slice(id);
    out.extend_from_slice(&coord);
    out
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
