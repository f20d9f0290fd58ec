//! Retrieval engine and pulse scheduler.
//!
//! [`MemoryEngine`] runs one query through embed → compress → extend →
//! optimize → sign → verify. [`PulseScheduler`] drives the engine on a
//! fixed 9-second, four-phase cadence and keeps the dashboard cache and
//! rolling stats that external consumers read.

pub mod clock;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod stats;

pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{CycleConfig, DashboardConfig, EngineConfig, PulseConfig};
pub use dashboard::{DashboardCache, DashboardEntry};
pub use engine::{MemoryEngine, MemoryPayload, MemoryResult};
pub use error::{EngineError, Result};
pub use scheduler::{CycleReport, Phase, PhaseTiming, PulseScheduler};
pub use stats::{LatencyWindow, PulseStats};
