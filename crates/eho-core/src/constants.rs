/// Number of components in a retrieval coordinate.
pub const COORDINATE_DIM: usize = 40;

/// Width of the raw text embedding fed to the compressor.
pub const EMBEDDING_DIM: usize = 768;

/// Slot D20: memory type (working / long_term / cache).
pub const SLOT_MEMORY_TYPE: usize = 20;

/// Slot D21: access frequency (cold / warm / hot).
pub const SLOT_ACCESS_FREQUENCY: usize = 21;

/// Slot D23: semantic cluster id in [0, 1).
pub const SLOT_CLUSTER_ID: usize = 23;

/// Slot D24: normalized wall-clock timestamp.
pub const SLOT_TIMESTAMP: usize = 24;

/// Slot D25: 1.0 when the coordinate will be signed.
pub const SLOT_SIGNATURE_FLAG: usize = 25;

/// Reserved metadata slots. Everything else carries compressed payload.
pub const METADATA_SLOTS: [usize; 5] = [
    SLOT_MEMORY_TYPE,
    SLOT_ACCESS_FREQUENCY,
    SLOT_CLUSTER_ID,
    SLOT_TIMESTAMP,
    SLOT_SIGNATURE_FLAG,
];

/// Payload slots the optimizer is allowed to move: D0-D19 and D22.
pub const PAYLOAD_SLOTS: [usize; 21] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 22,
];

/// Leading components folded into the cluster id.
pub const CLUSTER_SPAN: usize = 10;

/// Cluster hash modulus before normalization to [0, 1).
pub const CLUSTER_MODULUS: f64 = 1000.0;

/// Divisor turning unix seconds into the D24 timestamp (stays below 1.0 until 2286).
pub const TIMESTAMP_SCALE: f64 = 1e10;

/// Per-component tolerance when comparing coordinates.
pub const EPSILON: f64 = 1e-10;

/// Decades of gap reduction that count as full convergence.
pub const CONVERGENCE_DECADES: f64 = 4.0;

/// Lowest reported convergence score. Scores live in (0, 1].
pub const MIN_CONVERGENCE: f64 = 1e-3;

/// Weight of the most recent hot coordinate in the fitness landscape.
pub const HOT_ANCHOR_WEIGHT: f64 = 0.5;

/// Per-rank decay applied to older hot coordinates.
pub const HOT_ANCHOR_DECAY: f64 = 0.7;
