//! Post-quantum signing for eho coordinates.
//!
//! Keys are FIPS 204 ML-DSA-87, expanded from a per-identity seed so they
//! can be re-derived at will. Signatures carry the exact coordinate snapshot
//! they cover; verification fails closed.

pub mod digest;
pub mod error;
pub mod keys;
pub mod signer;

pub use digest::{DIGEST_LEN, LatticeDigest};
pub use error::{LatticeError, Result};
pub use keys::{ALGORITHM, DerivedSeeds, KeyPair, KeySource, PRIVATE_KEY_LEN, PUBLIC_KEY_LEN};
pub use signer::{BatchReport, LatticeSigner, SIGNATURE_LEN, Signature, signing_message};
