//! Query ingress: text in, refined and signed coordinate out.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use eho_core::time::now_iso8601;
use eho_core::{
    AccessFrequency, Coordinate, DimensionExtender, EmbeddingCompressor, HerdOptimizer,
    HerdOutcome, MemoryQuery, MemoryType, SLOT_CLUSTER_ID,
};
use eho_lattice::LatticeSigner;

use crate::config::PulseConfig;
use crate::error::Result;

/// The memory unit located at a result coordinate.
#[derive(Clone, Debug, Serialize)]
pub struct MemoryPayload {
    pub id: Uuid,
    pub identity: String,
    pub text: String,
    pub memory_type: MemoryType,
    pub access_frequency: AccessFrequency,
    pub cluster_id: f64,
    pub retrieved_at: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct MemoryResult {
    pub payload: MemoryPayload,
    pub coordinate: Coordinate,
    pub latency_ms: f64,
    pub signature_verified: bool,
    pub convergence: f64,
}

pub struct MemoryEngine {
    compressor: EmbeddingCompressor,
    extender: DimensionExtender,
    optimizer: HerdOptimizer,
    signer: LatticeSigner,
    /// Most recent first.
    history: HashMap<String, VecDeque<Coordinate>>,
    history_depth: usize,
    /// Keys of `history`, least recently located first.
    recency: VecDeque<String>,
    tracked_identities: usize,
}

impl MemoryEngine {
    pub fn new(config: &PulseConfig) -> Self {
        Self {
            compressor: EmbeddingCompressor::default(),
            extender: DimensionExtender::new(config.engine.signing_enabled),
            optimizer: HerdOptimizer::new(config.herd.clone()),
            signer: LatticeSigner::default(),
            history: HashMap::new(),
            history_depth: config.engine.history_depth,
            recency: VecDeque::new(),
            tracked_identities: config.engine.tracked_identities.max(1),
        }
    }

    pub fn with_signer(mut self, signer: LatticeSigner) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_compressor(mut self, compressor: EmbeddingCompressor) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn signer(&self) -> &LatticeSigner {
        &self.signer
    }

    pub fn signing_enabled(&self) -> bool {
        self.extender.signing_enabled
    }

    /// Recent hot/warm coordinates for `identity`, most recent first.
    pub fn history(&self, identity: &str) -> Vec<Coordinate> {
        self.history
            .get(identity)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of identities with remembered history.
    pub fn tracked_identities(&self) -> usize {
        self.history.len()
    }

    /// Drop everything remembered for `identity`.
    pub fn forget(&mut self, identity: &str) {
        self.history.remove(identity);
        self.recency.retain(|id| id != identity);
    }

    fn remember(&mut self, identity: &str, position: Coordinate) {
        if let Some(i) = self.recency.iter().position(|id| id == identity) {
            self.recency.remove(i);
        } else if self.recency.len() >= self.tracked_identities {
            if let Some(oldest) = self.recency.pop_front() {
                tracing::debug!(identity = %oldest, "history forgotten");
                self.history.remove(&oldest);
            }
        }
        self.recency.push_back(identity.to_string());

        let entry = self.history.entry(identity.to_string()).or_default();
        entry.push_front(position);
        entry.truncate(self.history_depth);
    }

    /// Compress, extend and optimize without signing.
    pub fn locate(&mut self, query: &MemoryQuery) -> Result<HerdOutcome> {
        let identity = query.identity_or_default();
        let base = self.compressor.encode(&query.text)?;
        let extended = self.extender.extend(&base, query);

        let hot = self.history(identity);
        let outcome = self
            .optimizer
            .optimize_with_history(&extended, identity, &hot);
        tracing::debug!(
            identity,
            convergence = outcome.convergence,
            iterations = outcome.iterations,
            "located"
        );

        if query.access_frequency.unwrap_or_default().is_tracked() && self.history_depth > 0 {
            self.remember(identity, outcome.position);
        }
        Ok(outcome)
    }

    /// Full pipeline: locate, then sign and verify the refined coordinate
    /// when signing is enabled.
    pub fn retrieve(&mut self, query: &MemoryQuery) -> Result<MemoryResult> {
        let started = Instant::now();
        let identity = query.identity_or_default().to_string();
        let outcome = self.locate(query)?;

        let signature_verified = if self.signing_enabled() {
            let signature = self.signer.sign(&identity, &outcome.position)?;
            self.signer.try_verify(&signature, &outcome.position)?
        } else {
            false
        };

        let payload = MemoryPayload {
            id: Uuid::new_v4(),
            identity,
            text: query.text.clone(),
            memory_type: query.memory_type.unwrap_or_default(),
            access_frequency: query.access_frequency.unwrap_or_default(),
            cluster_id: outcome.position[SLOT_CLUSTER_ID],
            retrieved_at: now_iso8601(),
        };

        Ok(MemoryResult {
            payload,
            coordinate: outcome.position,
            latency_ms: started.elapsed().as_secs_f64() * 1000.0,
            signature_verified,
            convergence: outcome.convergence,
        })
    }
}
