//! Retrieval-cost landscapes searched by the herd optimizer.
//!
//! Cost is lower-is-better and is evaluated over payload slots only.

use crate::constants::{HOT_ANCHOR_DECAY, HOT_ANCHOR_WEIGHT, PAYLOAD_SLOTS};
use crate::coordinate::Coordinate;

const PAYLOAD_DIM: usize = PAYLOAD_SLOTS.len();

/// A retrieval-cost function over payload vectors.
pub trait Fitness {
    /// Cost of a payload vector (length `PAYLOAD_SLOTS.len()`).
    fn cost(&self, payload: &[f64]) -> f64;

    /// Greatest lower bound of `cost`. Used to normalize convergence.
    fn lower_bound(&self) -> f64 {
        0.0
    }
}

/// One attractor in payload space.
#[derive(Clone, Copy, Debug)]
pub struct Anchor {
    pub payload: [f64; PAYLOAD_DIM],
    pub weight: f64,
}

/// Weighted squared distance to a set of anchors.
///
/// The query's own coordinate is one anchor; the identity's recently
/// accessed hot coordinates are the others, decaying with recency.
/// Minimum is at the weighted centroid, so the bound is exact.
#[derive(Clone, Debug)]
pub struct AnchorFitness {
    anchors: Vec<Anchor>,
    centroid: [f64; PAYLOAD_DIM],
    floor: f64,
}

impl AnchorFitness {
    pub fn new(anchors: Vec<Anchor>) -> Self {
        let anchors: Vec<Anchor> = anchors.into_iter().filter(|a| a.weight > 0.0).collect();
        let total: f64 = anchors.iter().map(|a| a.weight).sum();
        let mut centroid = [0.0; PAYLOAD_DIM];
        if total > 0.0 {
            for a in &anchors {
                for (c, v) in centroid.iter_mut().zip(a.payload.iter()) {
                    *c += a.weight * v / total;
                }
            }
        }
        let mut fitness = Self {
            anchors,
            centroid,
            floor: 0.0,
        };
        fitness.floor = fitness.cost(&centroid);
        fitness
    }

    /// Landscape for a query coordinate and the identity's hot history,
    /// most recent first.
    pub fn for_query(initial: &Coordinate, hot: &[Coordinate]) -> Self {
        let mut anchors = Vec::with_capacity(hot.len() + 1);
        anchors.push(Anchor {
            payload: initial.payload(),
            weight: 1.0,
        });
        let mut weight = HOT_ANCHOR_WEIGHT;
        for h in hot {
            anchors.push(Anchor {
                payload: h.payload(),
                weight,
            });
            weight *= HOT_ANCHOR_DECAY;
        }
        Self::new(anchors)
    }

    /// Payload vector of least cost.
    pub fn optimum(&self) -> &[f64; PAYLOAD_DIM] {
        &self.centroid
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }
}

impl Fitness for AnchorFitness {
    fn cost(&self, payload: &[f64]) -> f64 {
        self.anchors
            .iter()
            .map(|a| {
                a.weight
                    * a.payload
                        .iter()
                        .zip(payload)
                        .map(|(x, y)| (x - y) * (x - y))
                        .sum::<f64>()
            })
            .sum()
    }

    fn lower_bound(&self) -> f64 {
        self.floor
    }
}
