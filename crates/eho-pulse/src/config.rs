use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use eho_core::HerdConfig;

use crate::error::{EngineError, Result};
use crate::scheduler::Phase;

/// Full runtime configuration, loadable from TOML. Every field has a default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub cycle: CycleConfig,
    pub dashboard: DashboardConfig,
    pub herd: HerdConfig,
    pub engine: EngineConfig,
}

impl PulseConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }
}

/// Phase budgets and per-phase sample sizes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub ingest_ms: u64,
    pub optimize_ms: u64,
    pub dispatch_ms: u64,
    pub verify_ms: u64,
    /// Identities optimized per cycle.
    pub optimize_sample: usize,
    /// Dashboard entries read per cycle.
    pub dispatch_sample: usize,
    /// Recent entries re-signed and verified per cycle.
    pub verify_sample: usize,
    pub redistribution_ratio: f64,
    /// Cycles kept in the rolling latency average.
    pub latency_window: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            ingest_ms: 3000,
            optimize_ms: 3000,
            dispatch_ms: 2000,
            verify_ms: 1000,
            optimize_sample: 5,
            dispatch_sample: 10,
            verify_sample: 3,
            redistribution_ratio: 0.15,
            latency_window: 100,
        }
    }
}

impl CycleConfig {
    pub fn target(&self, phase: Phase) -> Duration {
        Duration::from_millis(match phase {
            Phase::Ingest => self.ingest_ms,
            Phase::Optimize => self.optimize_ms,
            Phase::Dispatch => self.dispatch_ms,
            Phase::Verify => self.verify_ms,
        })
    }

    /// Sum of the four phase targets.
    pub fn cycle_target(&self) -> Duration {
        Phase::ALL.iter().map(|p| self.target(*p)).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Written into D25 and gates signing in `retrieve`.
    pub signing_enabled: bool,
    /// Hot/warm coordinates remembered per identity.
    pub history_depth: usize,
    /// Identities with remembered history; the least recently located
    /// identity is forgotten first.
    pub tracked_identities: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            signing_enabled: true,
            history_depth: 8,
            tracked_identities: 1000,
        }
    }
}
