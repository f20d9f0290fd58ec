use crate::constants::{
    CLUSTER_MODULUS, CLUSTER_SPAN, SLOT_ACCESS_FREQUENCY, SLOT_CLUSTER_ID, SLOT_MEMORY_TYPE,
    SLOT_SIGNATURE_FLAG, SLOT_TIMESTAMP,
};
use crate::coordinate::Coordinate;
use crate::query::MemoryQuery;
use crate::time::{normalized_timestamp, now_unix_secs};

/// Writes query metadata into the reserved coordinate slots.
#[derive(Clone, Copy, Debug)]
pub struct DimensionExtender {
    pub signing_enabled: bool,
}

impl DimensionExtender {
    pub fn new(signing_enabled: bool) -> Self {
        Self { signing_enabled }
    }

    /// Extend using the current wall clock for D24.
    pub fn extend(&self, base: &Coordinate, query: &MemoryQuery) -> Coordinate {
        self.extend_at(base, query, now_unix_secs())
    }

    /// Extend with an explicit Unix timestamp.
    pub fn extend_at(&self, base: &Coordinate, query: &MemoryQuery, unix_secs: u64) -> Coordinate {
        let mut out = *base;
        out[SLOT_MEMORY_TYPE] = query.memory_type.unwrap_or_default().encode();
        out[SLOT_ACCESS_FREQUENCY] = query.access_frequency.unwrap_or_default().encode();
        out[SLOT_CLUSTER_ID] = cluster_id(base);
        out[SLOT_TIMESTAMP] = normalized_timestamp(unix_secs);
        out[SLOT_SIGNATURE_FLAG] = if self.signing_enabled { 1.0 } else { 0.0 };
        out
    }
}

impl Default for DimensionExtender {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Position-weighted sum of the leading components, folded into [0, 1).
pub fn cluster_id(base: &Coordinate) -> f64 {
    let hash: f64 = base
        .as_slice()
        .iter()
        .take(CLUSTER_SPAN)
        .enumerate()
        .map(|(i, v)| v * (i + 1) as f64)
        .sum();
    let folded = hash.rem_euclid(CLUSTER_MODULUS) / CLUSTER_MODULUS;
    // rem_euclid can round up to the modulus for tiny negative inputs.
    if folded >= 1.0 { 0.0 } else { folded }
}
