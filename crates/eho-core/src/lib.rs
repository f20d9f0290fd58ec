//! Elephant-herding memory geometry.
//!
//! Turns query text into a 40-dimensional coordinate (768-d embedding
//! compressed 40 ways, then five metadata slots), and refines the payload
//! placement with a clan-based herd optimizer whose landscape is shaped by
//! the identity's recent hot coordinates.
//!
//! Zero I/O. Signing lives in `eho-lattice`, scheduling in `eho-pulse`.

pub mod constants;
pub mod coordinate;
pub mod embedding;
pub mod error;
pub mod extend;
pub mod fitness;
pub mod herd;
pub mod query;
pub mod time;
pub mod tokenizer;

pub use constants::{
    COORDINATE_DIM, EMBEDDING_DIM, EPSILON, METADATA_SLOTS, PAYLOAD_SLOTS, SLOT_ACCESS_FREQUENCY,
    SLOT_CLUSTER_ID, SLOT_MEMORY_TYPE, SLOT_SIGNATURE_FLAG, SLOT_TIMESTAMP,
};
pub use coordinate::Coordinate;
pub use embedding::{
    Embedder, EmbeddingCompressor, HashingEmbedder, LinearProjection, MeanPoolProjection,
    Projection,
};
pub use error::{CoreError, Result};
pub use extend::{DimensionExtender, cluster_id};
pub use fitness::{Anchor, AnchorFitness, Fitness};
pub use herd::{HerdConfig, HerdOptimizer, HerdOutcome, convergence_score};
pub use query::{AccessFrequency, MemoryQuery, MemoryType};
