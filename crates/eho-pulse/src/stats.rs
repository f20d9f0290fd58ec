use std::collections::VecDeque;

use serde::Serialize;

/// Counters exposed to read-only consumers.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PulseStats {
    pub cycle_count: u64,
    pub ingested_units: u64,
    /// floor(ingested_units × redistribution_ratio) as of the last VERIFY.
    pub redistribution_share: u64,
    pub optimizations: u64,
    pub verifications: u64,
    /// Mean of the last `latency_window` cycles, measured after the phase
    /// pads and before the final cycle pad.
    pub avg_cycle_latency_ms: f64,
    pub active_identities: usize,
    pub last_cycle_at: Option<String>,
    /// Wall duration of the last cycle including padding.
    pub last_cycle_ms: f64,
    pub phase_overruns: u64,
    pub cycle_overruns: u64,
    pub optimization_failures: u64,
    pub verification_failures: u64,
}

/// Fixed-size rolling mean.
#[derive(Clone, Debug)]
pub struct LatencyWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn record(&mut self, ms: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(ms);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}
