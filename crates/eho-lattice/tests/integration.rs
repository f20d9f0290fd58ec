//! Signing across crate boundaries: core coordinates in, verdicts out.

use eho_core::{
    COORDINATE_DIM, Coordinate, DimensionExtender, EmbeddingCompressor, HerdOptimizer, MemoryQuery,
};
use eho_lattice::{LatticeSigner, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use proptest::prelude::*;

#[test]
fn key_derivation_is_bit_identical() {
    let signer = LatticeSigner::default();
    let a = signer.derive_key_pair("brand-001").unwrap();
    let b = signer.derive_key_pair("brand-001").unwrap();
    assert_eq!(a.public_key, b.public_key);
    assert_eq!(a.private_key(), b.private_key());
    assert_eq!(a.public_key.len(), PUBLIC_KEY_LEN);

    let other = signer.derive_key_pair("brand-002").unwrap();
    assert_ne!(a.public_key, other.public_key);
}

#[test]
fn pipeline_output_signs_and_verifies() {
    let query = MemoryQuery::new("hot dashboard lookup").with_identity("brand-042");
    let base = EmbeddingCompressor::default().encode(&query.text).unwrap();
    let extended = DimensionExtender::default().extend(&base, &query);
    let outcome = HerdOptimizer::default().optimize(&extended, "brand-042");

    let signer = LatticeSigner::default();
    let sig = signer.sign("brand-042", &outcome.position).unwrap();
    assert!(signer.verify(&sig, &outcome.position));
    assert!(outcome.convergence > 0.8);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn sign_then_verify_holds(
        values in prop::collection::vec(-1e3f64..1e3, COORDINATE_DIM),
        identity in "[a-z]{1,8}-[0-9]{3}",
    ) {
        let signer = LatticeSigner::default();
        let c = Coordinate::from_slice(&values).unwrap();
        let sig = signer.sign(&identity, &c).unwrap();
        prop_assert_eq!(sig.bytes.len(), SIGNATURE_LEN);
        prop_assert!(signer.verify(&sig, &c));
    }

    #[test]
    fn any_component_change_is_detected(
        values in prop::collection::vec(-1.0f64..1.0, COORDINATE_DIM),
        index in 0usize..COORDINATE_DIM,
        delta in 1e-9f64..1.0,
    ) {
        let signer = LatticeSigner::default();
        let c = Coordinate::from_slice(&values).unwrap();
        let sig = signer.sign("brand-001", &c).unwrap();
        let mut moved = c;
        moved[index] += delta;
        prop_assert!(!signer.verify(&sig, &moved));
    }
}
