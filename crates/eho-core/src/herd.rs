//! Elephant herding optimization over payload space.
//!
//! The herd is split into clans. Each iteration:
//! 1. Clan operator: every non-matriarch member steps toward its clan's
//!    matriarch with per-dimension random pull plus spread-scaled noise;
//!    a step is kept only if it lowers the member's cost. The matriarch
//!    moves to the clan centroid when that is cheaper, then takes one
//!    Gaussian scouting step whose width follows the one-fifth success
//!    rule.
//! 2. Separating operator: the worst member of each clan leaves and is
//!    replaced by a freshly sampled candidate.
//!
//! The global best is tracked elitistically, so the reported position never
//! regresses. Runs are reproducible for a fixed seed and identity.

use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::{CONVERGENCE_DECADES, EPSILON, MIN_CONVERGENCE, PAYLOAD_SLOTS};
use crate::coordinate::Coordinate;
use crate::fitness::{AnchorFitness, Fitness};
use crate::tokenizer::fnv1a;

const PAYLOAD_DIM: usize = PAYLOAD_SLOTS.len();

/// Scouting step multipliers. Balanced at a success rate near one in five.
const STEP_GROWTH: f64 = 1.5;
const STEP_SHRINK: f64 = 0.9;

/// Tunables for [`HerdOptimizer`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HerdConfig {
    pub clans: usize,
    pub clan_size: usize,
    pub max_iterations: usize,
    /// Pull strength toward the matriarch. Above 1 members can overshoot it.
    pub alpha: f64,
    /// Noise scale relative to a member's distance from its matriarch.
    pub beta: f64,
    /// Half-width of the sampling box around the initial payload.
    pub search_radius: f64,
    /// Iterations without improvement before stopping early.
    pub patience: usize,
    /// Smallest cost drop that counts as improvement.
    pub tolerance: f64,
    pub time_budget_ms: u64,
    pub seed: u64,
}

impl Default for HerdConfig {
    fn default() -> Self {
        Self {
            clans: 5,
            clan_size: 10,
            max_iterations: 150,
            alpha: 1.5,
            beta: 0.3,
            search_radius: 0.5,
            patience: 25,
            tolerance: 1e-12,
            time_budget_ms: 250,
            seed: 0x5EED,
        }
    }
}

impl HerdConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

/// Result of one optimization pass.
#[derive(Clone, Debug, Serialize)]
pub struct HerdOutcome {
    pub position: Coordinate,
    /// Normalized improvement in (0, 1].
    pub convergence: f64,
    pub best_cost: f64,
    pub initial_mean_cost: f64,
    pub lower_bound: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

#[derive(Clone, Copy, Debug)]
struct Elephant {
    payload: [f64; PAYLOAD_DIM],
    cost: f64,
}

impl Elephant {
    fn evaluate(payload: [f64; PAYLOAD_DIM], fitness: &impl Fitness) -> Self {
        Self {
            payload,
            cost: fitness.cost(&payload),
        }
    }
}

struct Clan {
    members: Vec<Elephant>,
    /// Standard deviation of the matriarch's scouting step.
    step: f64,
}

impl Clan {
    fn matriarch(&self) -> usize {
        argmin(self.members.iter().map(|e| e.cost))
    }

    /// Worst member other than the matriarch.
    fn worst(&self, matriarch: usize) -> usize {
        let mut worst = if matriarch == 0 { 1 } else { 0 };
        for (i, e) in self.members.iter().enumerate() {
            if i != matriarch && e.cost > self.members[worst].cost {
                worst = i;
            }
        }
        worst
    }

    fn centroid(&self) -> [f64; PAYLOAD_DIM] {
        centroid(self.members.iter())
    }

    /// Clan operator. Returns the number of fitness evaluations spent.
    fn update(
        &mut self,
        config: &HerdConfig,
        fitness: &impl Fitness,
        rng: &mut impl Rng,
    ) -> usize {
        let m = self.matriarch();
        let leader = self.members[m].payload;
        let mut evaluations = 0;

        for (j, member) in self.members.iter_mut().enumerate() {
            if j == m {
                continue;
            }
            let spread = rms_distance(&member.payload, &leader);
            let mut candidate = member.payload;
            for (d, c) in candidate.iter_mut().enumerate() {
                let pull = config.alpha * rng.random::<f64>() * (leader[d] - *c);
                *c += pull + config.beta * spread * gauss_random(rng);
            }
            let next = Elephant::evaluate(candidate, fitness);
            evaluations += 1;
            if next.cost < member.cost {
                *member = next;
            }
        }

        let center = Elephant::evaluate(self.centroid(), fitness);
        evaluations += 1;
        if center.cost < self.members[m].cost {
            self.members[m] = center;
        }

        evaluations + self.scout(fitness, rng)
    }

    /// One Gaussian step from the matriarch. Success widens the next step,
    /// failure narrows it.
    fn scout(&mut self, fitness: &impl Fitness, rng: &mut impl Rng) -> usize {
        let m = self.matriarch();
        let mut candidate = self.members[m].payload;
        for c in candidate.iter_mut() {
            *c += self.step * gauss_random(rng);
        }
        let next = Elephant::evaluate(candidate, fitness);
        if next.cost < self.members[m].cost {
            self.members[m] = next;
            self.step *= STEP_GROWTH;
        } else {
            self.step *= STEP_SHRINK;
        }
        1
    }

    /// Separating operator: the worst member leaves, a fresh one joins.
    fn separate(&mut self, newcomer: Elephant) {
        if self.members.len() < 2 {
            return;
        }
        let m = self.matriarch();
        let w = self.worst(m);
        self.members[w] = newcomer;
    }
}

/// Clan-based metaheuristic that refines a coordinate's payload placement.
#[derive(Clone, Debug, Default)]
pub struct HerdOptimizer {
    config: HerdConfig,
}

impl HerdOptimizer {
    pub fn new(config: HerdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HerdConfig {
        &self.config
    }

    /// Optimize with no access history: the query coordinate is the only anchor.
    pub fn optimize(&self, initial: &Coordinate, identity: &str) -> HerdOutcome {
        self.optimize_with_history(initial, identity, &[])
    }

    /// Optimize against the identity's hot coordinates, most recent first.
    pub fn optimize_with_history(
        &self,
        initial: &Coordinate,
        identity: &str,
        hot: &[Coordinate],
    ) -> HerdOutcome {
        let fitness = AnchorFitness::for_query(initial, hot);
        self.optimize_fitness(initial, identity, &fitness)
    }

    /// Optimize an arbitrary landscape. Metadata slots of `initial` are
    /// carried through untouched.
    pub fn optimize_fitness(
        &self,
        initial: &Coordinate,
        identity: &str,
        fitness: &impl Fitness,
    ) -> HerdOutcome {
        let config = &self.config;
        let started = Instant::now();
        let budget = config.time_budget();
        let mut rng = SmallRng::seed_from_u64(config.seed ^ fnv1a(identity.as_bytes()));

        let origin = initial.payload();
        let clan_count = config.clans.max(1);
        let clan_size = config.clan_size.max(2);

        let mut clans: Vec<Clan> = (0..clan_count)
            .map(|c| Clan {
                members: (0..clan_size)
                    .map(|m| {
                        let payload = if c == 0 && m == 0 {
                            origin
                        } else {
                            sample_around(&origin, config.search_radius, &mut rng)
                        };
                        Elephant::evaluate(payload, fitness)
                    })
                    .collect(),
                step: config.search_radius,
            })
            .collect();

        let mut evaluations = clan_count * clan_size;
        let initial_mean_cost = clans
            .iter()
            .flat_map(|c| c.members.iter())
            .map(|e| e.cost)
            .sum::<f64>()
            / evaluations as f64;
        let mut best = herd_best(&clans);

        let mut iterations = 0;
        let mut stalled = 0;
        while iterations < config.max_iterations {
            if started.elapsed() >= budget {
                break;
            }

            for clan in &mut clans {
                evaluations += clan.update(config, fitness, &mut rng);
            }

            for clan in &mut clans {
                let fresh = sample_around(&origin, config.search_radius, &mut rng);
                clan.separate(Elephant::evaluate(fresh, fitness));
                evaluations += 1;
            }

            iterations += 1;
            let candidate = herd_best(&clans);
            if best.cost - candidate.cost > config.tolerance {
                best = candidate;
                stalled = 0;
            } else {
                stalled += 1;
                if stalled >= config.patience {
                    break;
                }
            }
        }

        let lower_bound = fitness.lower_bound();
        let convergence = convergence_score(
            initial_mean_cost - lower_bound,
            best.cost - lower_bound,
        );

        HerdOutcome {
            position: initial.with_payload(&best.payload),
            convergence,
            best_cost: best.cost,
            initial_mean_cost,
            lower_bound,
            iterations,
            evaluations,
        }
    }
}

/// Normalized improvement in (0, 1]: decades of gap reduction divided by
/// `CONVERGENCE_DECADES`. A gap already at the floor scores 1.
pub fn convergence_score(initial_gap: f64, final_gap: f64) -> f64 {
    if initial_gap <= EPSILON {
        return 1.0;
    }
    let final_gap = final_gap.max(0.0);
    if final_gap <= initial_gap * 10f64.powf(-CONVERGENCE_DECADES) {
        return 1.0;
    }
    ((initial_gap / final_gap).log10() / CONVERGENCE_DECADES).clamp(MIN_CONVERGENCE, 1.0)
}

fn herd_best(clans: &[Clan]) -> Elephant {
    let mut best = clans[0].members[0];
    for e in clans.iter().flat_map(|c| c.members.iter()) {
        if e.cost < best.cost {
            best = *e;
        }
    }
    best
}

fn argmin(costs: impl Iterator<Item = f64>) -> usize {
    let mut best = (0, f64::INFINITY);
    for (i, c) in costs.enumerate() {
        if c < best.1 {
            best = (i, c);
        }
    }
    best.0
}

fn centroid<'a>(members: impl Iterator<Item = &'a Elephant>) -> [f64; PAYLOAD_DIM] {
    let mut sum = [0.0; PAYLOAD_DIM];
    let mut n = 0usize;
    for e in members {
        for (s, v) in sum.iter_mut().zip(e.payload.iter()) {
            *s += v;
        }
        n += 1;
    }
    if n > 0 {
        sum.iter_mut().for_each(|s| *s /= n as f64);
    }
    sum
}

fn rms_distance(a: &[f64; PAYLOAD_DIM], b: &[f64; PAYLOAD_DIM]) -> f64 {
    let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    (sq / PAYLOAD_DIM as f64).sqrt()
}

/// Uniform sample in the box `center ± radius`.
fn sample_around(
    center: &[f64; PAYLOAD_DIM],
    radius: f64,
    rng: &mut impl Rng,
) -> [f64; PAYLOAD_DIM] {
    let mut out = *center;
    if radius > 0.0 {
        for v in out.iter_mut() {
            *v += rng.random_range(-radius..radius);
        }
    }
    out
}

/// Box-Muller transform for generating Gaussian-distributed random numbers.
fn gauss_random(rng: &mut impl Rng) -> f64 {
    // Clamp u1 away from 0 to avoid ln(0) = -inf
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::METADATA_SLOTS;
    use crate::fitness::Anchor;

    fn slow_budget() -> HerdConfig {
        HerdConfig {
            time_budget_ms: 60_000,
            ..HerdConfig::default()
        }
    }

    fn offset_landscape(origin: &Coordinate) -> AnchorFitness {
        let mut hot = origin.payload();
        hot.iter_mut().for_each(|v| *v += 0.2);
        AnchorFitness::new(vec![
            Anchor {
                payload: origin.payload(),
                weight: 1.0,
            },
            Anchor {
                payload: hot,
                weight: 1.0,
            },
        ])
    }

    #[test]
    fn test_convergence_score_bounds() {
        assert_eq!(convergence_score(0.0, 0.0), 1.0);
        assert_eq!(convergence_score(1.0, 0.0), 1.0);
        assert_eq!(convergence_score(1.0, 1e-5), 1.0);
        assert!((convergence_score(1.0, 1e-2) - 0.5).abs() < 1e-12);
        assert_eq!(convergence_score(1.0, 1.0), MIN_CONVERGENCE);
        assert_eq!(convergence_score(1.0, 5.0), MIN_CONVERGENCE);
    }

    #[test]
    fn test_fresh_identity_keeps_query_position() {
        let initial = Coordinate::splat(0.05);
        let out = HerdOptimizer::new(slow_budget()).optimize(&initial, "brand-042");
        assert!(out.position.approx_eq(&initial, 1e-9));
        assert_eq!(out.convergence, 1.0);
    }

    #[test]
    fn test_deterministic_for_seed_and_identity() {
        let initial = Coordinate::splat(0.1);
        let f = offset_landscape(&initial);
        let opt = HerdOptimizer::new(slow_budget());
        let a = opt.optimize_fitness(&initial, "brand-001", &f);
        let b = opt.optimize_fitness(&initial, "brand-001", &f);
        assert_eq!(a.position.as_array(), b.position.as_array());
        assert_eq!(a.convergence, b.convergence);
        assert_eq!(a.evaluations, b.evaluations);
    }

    #[test]
    fn test_improves_on_query_coordinate() {
        let initial = Coordinate::splat(0.1);
        let f = offset_landscape(&initial);
        let start = f.cost(&initial.payload());
        let out = HerdOptimizer::new(slow_budget()).optimize_fitness(&initial, "brand-001", &f);
        assert!(out.best_cost < start, "{} !< {start}", out.best_cost);
        assert!(out.best_cost >= f.lower_bound() - 1e-12);
        assert!(out.convergence > 0.0 && out.convergence <= 1.0);
        assert!(out.iterations > 0);
    }

    #[test]
    fn test_offset_landscape_converges() {
        let initial = Coordinate::splat(0.1);
        let f = offset_landscape(&initial);
        for identity in ["brand-001", "brand-002", "brand-042"] {
            let out = HerdOptimizer::new(slow_budget()).optimize_fitness(&initial, identity, &f);
            assert!(out.convergence > 0.8, "{identity}: {}", out.convergence);
        }
    }

    #[test]
    fn test_hot_history_moves_off_query() {
        let initial = Coordinate::splat(0.1);
        let hot = [Coordinate::splat(0.3), Coordinate::splat(-0.05)];
        let out =
            HerdOptimizer::new(slow_budget()).optimize_with_history(&initial, "brand-042", &hot);
        assert!(out.convergence > 0.8, "{}", out.convergence);
        assert!(!out.position.approx_eq(&initial, 1e-3));

        let f = AnchorFitness::for_query(&initial, &hot);
        for (got, want) in out.position.payload().iter().zip(f.optimum()) {
            assert!((got - want).abs() < 0.05, "{got} vs {want}");
        }
    }

    #[test]
    fn test_metadata_slots_untouched() {
        let mut initial = Coordinate::splat(0.1);
        for slot in METADATA_SLOTS {
            initial[slot] = 0.75;
        }
        let f = offset_landscape(&initial);
        let out = HerdOptimizer::new(slow_budget()).optimize_fitness(&initial, "brand-007", &f);
        for slot in METADATA_SLOTS {
            assert_eq!(out.position[slot], 0.75);
        }
    }

    #[test]
    fn test_zero_budget_returns_initial_population_best() {
        let cfg = HerdConfig {
            time_budget_ms: 0,
            ..HerdConfig::default()
        };
        let initial = Coordinate::splat(0.1);
        let out = HerdOptimizer::new(cfg).optimize(&initial, "x");
        assert_eq!(out.iterations, 0);
        assert_eq!(out.evaluations, 50);
        assert!(out.convergence > 0.0);
    }

    #[test]
    fn test_degenerate_config_still_runs() {
        let cfg = HerdConfig {
            clans: 0,
            clan_size: 0,
            search_radius: 0.0,
            time_budget_ms: 1_000,
            ..HerdConfig::default()
        };
        let out = HerdOptimizer::new(cfg).optimize(&Coordinate::splat(0.3), "x");
        assert_eq!(out.position.len(), 40);
        assert_eq!(out.convergence, 1.0);
    }
}
