//! Text → 768-d embedding → 40-d coordinate.
//!
//! Both stages sit behind traits so a trained encoder or a learned
//! projection matrix can replace the defaults without changing the
//! 768 → 40 contract.

use crate::constants::{COORDINATE_DIM, EMBEDDING_DIM};
use crate::coordinate::Coordinate;
use crate::error::{CoreError, Result};
use crate::tokenizer::{char_trigrams, fnv1a, tokenize};

/// Produces a fixed-width embedding for a piece of text.
pub trait Embedder: Send + Sync {
    /// Output width. Always `EMBEDDING_DIM` for embedders used by the compressor.
    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }

    fn embed(&self, text: &str) -> Vec<f64>;
}

/// Reduces an embedding to a coordinate.
pub trait Projection: Send + Sync {
    fn project(&self, vector: &[f64]) -> Result<Coordinate>;
}

/// Deterministic signed feature hashing over word tokens and character
/// trigrams, L2-normalized. Texts sharing vocabulary land close together.
#[derive(Clone, Debug)]
pub struct HashingEmbedder {
    dim: usize,
    trigram_weight: f64,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self {
            dim: EMBEDDING_DIM,
            trigram_weight: 0.5,
        }
    }

    fn accumulate(&self, out: &mut [f64], feature: &str, weight: f64) {
        let h = fnv1a(feature.as_bytes());
        let bucket = (h % self.dim as u64) as usize;
        // Top bit picks the sign so collisions cancel rather than pile up.
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        out[bucket] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Vec<f64> {
        let mut out = vec![0.0; self.dim];
        for token in tokenize(text) {
            self.accumulate(&mut out, &format!("w:{token}"), 1.0);
            for tri in char_trigrams(&token) {
                self.accumulate(&mut out, &format!("c:{tri}"), self.trigram_weight);
            }
        }
        let norm = out.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            out.iter_mut().for_each(|v| *v /= norm);
        }
        out
    }
}

/// Mean-pools 40 contiguous equal blocks. Block width is
/// `floor(len / 40)`; trailing components that do not fill a block are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeanPoolProjection;

impl Projection for MeanPoolProjection {
    fn project(&self, vector: &[f64]) -> Result<Coordinate> {
        if vector.len() != EMBEDDING_DIM {
            return Err(CoreError::InputShape {
                expected: EMBEDDING_DIM,
                actual: vector.len(),
            });
        }
        let stride = vector.len() / COORDINATE_DIM;
        let mut out = [0.0; COORDINATE_DIM];
        for (i, o) in out.iter_mut().enumerate() {
            let block = &vector[i * stride..(i + 1) * stride];
            *o = block.iter().sum::<f64>() / stride as f64;
        }
        Ok(Coordinate::new(out))
    }
}

/// Learned 40 × 768 projection, row-major.
#[derive(Clone, Debug)]
pub struct LinearProjection {
    weights: Vec<f64>,
}

impl LinearProjection {
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.len() != COORDINATE_DIM * EMBEDDING_DIM {
            return Err(CoreError::InputShape {
                expected: COORDINATE_DIM * EMBEDDING_DIM,
                actual: weights.len(),
            });
        }
        Ok(Self { weights })
    }

    /// The matrix that reproduces [`MeanPoolProjection`] exactly.
    pub fn mean_pool() -> Self {
        let stride = EMBEDDING_DIM / COORDINATE_DIM;
        let mut weights = vec![0.0; COORDINATE_DIM * EMBEDDING_DIM];
        for row in 0..COORDINATE_DIM {
            for col in row * stride..(row + 1) * stride {
                weights[row * EMBEDDING_DIM + col] = 1.0 / stride as f64;
            }
        }
        Self { weights }
    }
}

impl Projection for LinearProjection {
    fn project(&self, vector: &[f64]) -> Result<Coordinate> {
        if vector.len() != EMBEDDING_DIM {
            return Err(CoreError::InputShape {
                expected: EMBEDDING_DIM,
                actual: vector.len(),
            });
        }
        let mut out = [0.0; COORDINATE_DIM];
        for (row, o) in out.iter_mut().enumerate() {
            let w = &self.weights[row * EMBEDDING_DIM..(row + 1) * EMBEDDING_DIM];
            *o = w.iter().zip(vector).map(|(a, b)| a * b).sum();
        }
        Ok(Coordinate::new(out))
    }
}

/// Embedder + projection pair.
pub struct EmbeddingCompressor {
    embedder: Box<dyn Embedder>,
    projection: Box<dyn Projection>,
}

impl EmbeddingCompressor {
    pub fn new(embedder: Box<dyn Embedder>, projection: Box<dyn Projection>) -> Self {
        Self {
            embedder,
            projection,
        }
    }

    pub fn embed(&self, text: &str) -> Vec<f64> {
        self.embedder.embed(text)
    }

    pub fn compress(&self, vector: &[f64]) -> Result<Coordinate> {
        self.projection.project(vector)
    }

    /// `compress(embed(text))`.
    pub fn encode(&self, text: &str) -> Result<Coordinate> {
        self.compress(&self.embed(text))
    }
}

impl Default for EmbeddingCompressor {
    fn default() -> Self {
        Self::new(Box::new(HashingEmbedder::new()), Box::new(MeanPoolProjection))
    }
}
