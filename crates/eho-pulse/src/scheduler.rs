//! Fixed-cadence four-phase pulse loop.
//!
//! INGEST → OPTIMIZE → DISPATCH → VERIFY, each padded to its target, then
//! the cycle padded to the sum of the targets. Overruns are logged and
//! counted, never compensated. `stop()` takes effect between cycles only.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use eho_core::time::now_iso8601;
use eho_core::{HerdOutcome, MemoryQuery};
use eho_lattice::LatticeSigner;

use crate::clock::{Clock, TokioClock};
use crate::config::{CycleConfig, PulseConfig};
use crate::dashboard::{DashboardCache, DashboardEntry};
use crate::engine::MemoryEngine;
use crate::error::Result;
use crate::stats::{LatencyWindow, PulseStats};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Ingest,
    Optimize,
    Dispatch,
    Verify,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Ingest, Phase::Optimize, Phase::Dispatch, Phase::Verify];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Ingest => "ingest",
            Phase::Optimize => "optimize",
            Phase::Dispatch => "dispatch",
            Phase::Verify => "verify",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub target_ms: f64,
    pub elapsed_ms: f64,
    pub overrun: bool,
}

/// What one cycle did.
#[derive(Clone, Debug, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub phases: Vec<PhaseTiming>,
    /// Work time before the final pad.
    pub work_ms: f64,
    /// Wall time including the final pad.
    pub total_ms: f64,
    pub overrun: bool,
}

struct PulseState {
    cycle: CycleConfig,
    dashboard: DashboardCache,
    stats: PulseStats,
    latency: LatencyWindow,
    inbox: VecDeque<MemoryQuery>,
    /// Activation order; OPTIMIZE walks it round-robin. Never longer than
    /// the dashboard capacity.
    active: Vec<String>,
    latest: HashMap<String, MemoryQuery>,
    cursor: usize,
}

impl PulseState {
    /// Drain the inbox. Returns the unit count and the identities retired
    /// to keep the active set within the dashboard capacity.
    fn ingest(&mut self) -> (usize, Vec<String>) {
        let mut count = 0;
        let mut retired = Vec::new();
        while let Some(query) = self.inbox.pop_front() {
            let identity = query.identity_or_default().to_string();
            if !self.latest.contains_key(&identity) {
                if self.active.len() >= self.dashboard.capacity() {
                    let oldest = self.active[0].clone();
                    self.retire(&oldest);
                    retired.push(oldest);
                }
                self.active.push(identity.clone());
            }
            self.latest.insert(identity, query);
            count += 1;
        }
        self.stats.ingested_units += count as u64;
        self.stats.active_identities = self.active.len();
        (count, retired)
    }

    fn retire(&mut self, identity: &str) {
        if let Some(i) = self.active.iter().position(|id| id == identity) {
            self.active.remove(i);
            if i < self.cursor {
                self.cursor -= 1;
            }
            if self.cursor >= self.active.len() {
                self.cursor = 0;
            }
        }
        self.latest.remove(identity);
        tracing::debug!(identity, "identity retired");
    }

    /// Next round-robin slice of active identities with their latest query.
    fn optimize_batch(&mut self) -> Vec<(String, MemoryQuery)> {
        let sample = self.cycle.optimize_sample.min(self.active.len());
        let mut batch = Vec::with_capacity(sample);
        for _ in 0..sample {
            let identity = self.active[self.cursor % self.active.len()].clone();
            self.cursor = (self.cursor + 1) % self.active.len();
            if let Some(query) = self.latest.get(&identity) {
                batch.push((identity, query.clone()));
            }
        }
        batch
    }

    fn record_optimized(&mut self, located: Vec<(String, Result<HerdOutcome>)>) -> usize {
        let mut done = 0;
        for (identity, outcome) in located {
            match outcome {
                Ok(outcome) => {
                    self.dashboard.upsert(&identity, outcome.position);
                    self.stats.optimizations += 1;
                    done += 1;
                }
                Err(e) => {
                    tracing::warn!("optimization failed for {identity}: {e}");
                    self.stats.optimization_failures += 1;
                }
            }
        }
        done
    }

    fn dispatch(&mut self) -> usize {
        let sample: Vec<String> = self
            .dashboard
            .recent(self.cycle.dispatch_sample)
            .into_iter()
            .map(|e| e.identity)
            .collect();
        sample
            .iter()
            .filter(|id| self.dashboard.touch(id).is_some())
            .count()
    }

    fn record_verified(&mut self, verdicts: &[bool]) -> usize {
        let verified = verdicts.iter().filter(|ok| **ok).count();
        self.stats.verifications += verified as u64;
        self.stats.verification_failures += (verdicts.len() - verified) as u64;
        let share = self.stats.ingested_units as f64 * self.cycle.redistribution_ratio;
        self.stats.redistribution_share = share.floor() as u64;
        verified
    }
}

/// Re-sign a dashboard coordinate and check it. Failures count, never abort.
fn sign_and_verify(signer: &LatticeSigner, entry: &DashboardEntry) -> bool {
    match signer.sign(&entry.identity, &entry.coordinate) {
        Ok(signature) => signer.verify(&signature, &entry.coordinate),
        Err(e) => {
            tracing::warn!("signing failed for {}: {e}", entry.identity);
            false
        }
    }
}

/// Owns one engine, dashboard cache and stats block. Cheap to clone; clones
/// share state.
///
/// The engine sits behind its own lock so stats and dashboard readers never
/// wait on herd search or signing.
pub struct PulseScheduler<C: Clock = TokioClock> {
    state: Arc<Mutex<PulseState>>,
    engine: Arc<Mutex<MemoryEngine>>,
    clock: Arc<C>,
    cancel: CancellationToken,
}

impl<C: Clock> Clone for PulseScheduler<C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            engine: Arc::clone(&self.engine),
            clock: Arc::clone(&self.clock),
            cancel: self.cancel.clone(),
        }
    }
}

impl PulseScheduler<TokioClock> {
    pub fn new(config: &PulseConfig) -> Self {
        Self::with_clock(config, TokioClock::new())
    }
}

impl<C: Clock> PulseScheduler<C> {
    pub fn with_clock(config: &PulseConfig, clock: C) -> Self {
        Self::with_engine(config, MemoryEngine::new(config), clock)
    }

    pub fn with_engine(config: &PulseConfig, engine: MemoryEngine, clock: C) -> Self {
        Self {
            state: Arc::new(Mutex::new(PulseState {
                cycle: config.cycle.clone(),
                dashboard: DashboardCache::new(config.dashboard.capacity),
                stats: PulseStats::default(),
                latency: LatencyWindow::new(config.cycle.latency_window),
                inbox: VecDeque::new(),
                active: Vec::new(),
                latest: HashMap::new(),
                cursor: 0,
            })),
            engine: Arc::new(Mutex::new(engine)),
            clock: Arc::new(clock),
            cancel: CancellationToken::new(),
        }
    }

    pub fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    /// Queue a memory unit for the next INGEST phase.
    pub async fn submit(&self, query: MemoryQuery) {
        self.state.lock().await.inbox.push_back(query);
    }

    pub async fn stats(&self) -> PulseStats {
        self.state.lock().await.stats.clone()
    }

    pub async fn dashboard(&self) -> Vec<DashboardEntry> {
        self.state.lock().await.dashboard.snapshot()
    }

    /// Request a stop. A cycle already running completes first.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until `stop()`.
    pub async fn run(&self) -> PulseStats {
        tracing::info!("pulse loop started");
        while !self.cancel.is_cancelled() {
            self.run_cycle().await;
        }
        tracing::info!("pulse loop stopped");
        self.stats().await
    }

    /// Run at most `n` cycles, fewer if stopped.
    pub async fn run_cycles(&self, n: u64) -> PulseStats {
        for _ in 0..n {
            if self.cancel.is_cancelled() {
                break;
            }
            self.run_cycle().await;
        }
        self.stats().await
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let cycle = self.state.lock().await.cycle.clone();
        let cycle_target = cycle.cycle_target();
        let cycle_start = self.clock.now();
        let mut phases = Vec::with_capacity(Phase::ALL.len());

        for phase in Phase::ALL {
            let target = cycle.target(phase);
            let started = self.clock.now();
            let units = self.execute(phase).await;
            let elapsed = self.clock.now().saturating_sub(started);
            let overrun = elapsed > target;
            if overrun {
                tracing::warn!(
                    "{} phase overran: {:.0}ms > {}ms",
                    phase.name(),
                    ms(elapsed),
                    target.as_millis()
                );
                self.state.lock().await.stats.phase_overruns += 1;
            } else {
                self.clock.sleep(target - elapsed).await;
            }
            tracing::debug!(phase = phase.name(), units, "phase complete");
            phases.push(PhaseTiming {
                phase,
                target_ms: ms(target),
                elapsed_ms: ms(elapsed),
                overrun,
            });
        }

        let work = self.clock.now().saturating_sub(cycle_start);
        let overrun = work > cycle_target;
        if overrun {
            tracing::warn!(
                "cycle overran: {:.0}ms > {}ms",
                ms(work),
                cycle_target.as_millis()
            );
        } else {
            self.clock.sleep(cycle_target - work).await;
        }
        let total = self.clock.now().saturating_sub(cycle_start);

        let mut state = self.state.lock().await;
        state.latency.record(ms(work));
        let stats = &mut state.stats;
        stats.cycle_count += 1;
        if overrun {
            stats.cycle_overruns += 1;
        }
        stats.last_cycle_at = Some(now_iso8601());
        stats.last_cycle_ms = ms(total);
        let avg = state.latency.average();
        state.stats.avg_cycle_latency_ms = avg;
        let number = state.stats.cycle_count;
        tracing::info!(
            cycle = number,
            ingested = state.stats.ingested_units,
            optimizations = state.stats.optimizations,
            verifications = state.stats.verifications,
            "pulse cycle complete"
        );

        CycleReport {
            cycle: number,
            phases,
            work_ms: ms(work),
            total_ms: ms(total),
            overrun,
        }
    }

    async fn execute(&self, phase: Phase) -> usize {
        match phase {
            Phase::Ingest => {
                let (count, retired) = self.state.lock().await.ingest();
                if !retired.is_empty() {
                    let mut engine = self.engine.lock().await;
                    for identity in &retired {
                        engine.forget(identity);
                    }
                }
                count
            }
            Phase::Optimize => {
                let batch = self.state.lock().await.optimize_batch();
                if batch.is_empty() {
                    return 0;
                }
                let located: Vec<_> = {
                    let mut engine = self.engine.lock().await;
                    batch
                        .into_iter()
                        .map(|(identity, query)| {
                            let outcome = engine.locate(&query);
                            (identity, outcome)
                        })
                        .collect()
                };
                self.state.lock().await.record_optimized(located)
            }
            Phase::Dispatch => self.state.lock().await.dispatch(),
            Phase::Verify => {
                let sample = {
                    let state = self.state.lock().await;
                    state.dashboard.recent(state.cycle.verify_sample)
                };
                let signer = self.engine.lock().await.signer().clone();
                let verdicts: Vec<bool> = sample
                    .iter()
                    .map(|entry| sign_and_verify(&signer, entry))
                    .collect();
                self.state.lock().await.record_verified(&verdicts)
            }
        }
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
