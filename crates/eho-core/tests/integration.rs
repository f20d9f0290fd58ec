//! Integration tests across the core pipeline:
//! text → embedding → coordinate → extended coordinate → herd refinement.

use eho_core::{
    AccessFrequency, Anchor, AnchorFitness, COORDINATE_DIM, Coordinate, DimensionExtender,
    EMBEDDING_DIM, EmbeddingCompressor, Fitness, HerdConfig, HerdOptimizer, METADATA_SLOTS,
    MeanPoolProjection, MemoryQuery, MemoryType, PAYLOAD_SLOTS, Projection, convergence_score,
};
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const PAYLOAD_DIM: usize = PAYLOAD_SLOTS.len();

fn herd_config() -> HerdConfig {
    HerdConfig {
        time_budget_ms: 60_000,
        ..HerdConfig::default()
    }
}

/// Query anchor plus one equally weighted hot anchor 0.2 away on every axis.
/// The optimum sits halfway between them.
fn workload(query: &Coordinate) -> AnchorFitness {
    let mut hot = query.payload();
    hot.iter_mut().for_each(|v| *v += 0.2);
    AnchorFitness::new(vec![
        Anchor {
            payload: query.payload(),
            weight: 1.0,
        },
        Anchor {
            payload: hot,
            weight: 1.0,
        },
    ])
}

/// Ant System over a discretized search box: each payload axis offers nine
/// levels 0.2 apart centered on the query, ants pick one level per axis with
/// probability proportional to pheromone, and the best ant of each round
/// deposits 1/cost.
fn ant_colony_best(query: &Coordinate, fitness: &impl Fitness, evaluations: usize) -> f64 {
    const LEVELS: usize = 9;
    const ANTS: usize = 20;
    const EVAPORATION: f64 = 0.1;

    let origin = query.payload();
    let level = |d: usize, k: usize| origin[d] + (k as f64 - 4.0) * 0.2;
    let mut pheromone = [[1.0f64; LEVELS]; PAYLOAD_DIM];
    let mut rng = SmallRng::seed_from_u64(42);
    let mut best = f64::INFINITY;
    let mut spent = 0;

    while spent < evaluations {
        let mut round_best: Option<([usize; PAYLOAD_DIM], f64)> = None;
        for _ in 0..ANTS {
            let mut path = [0usize; PAYLOAD_DIM];
            let mut x = [0.0; PAYLOAD_DIM];
            for d in 0..PAYLOAD_DIM {
                let total: f64 = pheromone[d].iter().sum();
                let mut pick = rng.random::<f64>() * total;
                let mut k = LEVELS - 1;
                for (i, tau) in pheromone[d].iter().enumerate() {
                    if pick < *tau {
                        k = i;
                        break;
                    }
                    pick -= tau;
                }
                path[d] = k;
                x[d] = level(d, k);
            }
            let cost = fitness.cost(&x);
            spent += 1;
            best = best.min(cost);
            if round_best.as_ref().is_none_or(|(_, c)| cost < *c) {
                round_best = Some((path, cost));
            }
        }
        for row in pheromone.iter_mut() {
            row.iter_mut().for_each(|tau| *tau *= 1.0 - EVAPORATION);
        }
        if let Some((path, cost)) = round_best {
            for (d, k) in path.iter().enumerate() {
                pheromone[d][*k] += 1.0 / cost.max(1e-9);
            }
        }
    }
    best
}

#[test]
fn herd_beats_ant_colony_baseline() {
    let query = Coordinate::splat(0.1);
    let fitness = workload(&query);
    let outcome = HerdOptimizer::new(herd_config()).optimize_fitness(&query, "brand-001", &fitness);

    let floor = fitness.lower_bound();
    let initial_gap = outcome.initial_mean_cost - floor;
    let aco_best = ant_colony_best(&query, &fitness, outcome.evaluations.max(1000));
    let aco = convergence_score(initial_gap, aco_best - floor);
    let eho = outcome.convergence;

    assert!(
        eho >= 1.2 * aco,
        "herd convergence {eho:.4} should beat ant colony {aco:.4} by 20%"
    );
    assert!(eho > 0.8, "herd convergence {eho:.4} on a two-anchor landscape");
    assert!(outcome.best_cost > floor - 1e-12);
}

#[test]
fn full_pipeline_keeps_metadata_and_shape() {
    let compressor = EmbeddingCompressor::default();
    let query = MemoryQuery::new("Retrieve brand dashboard for Monster Omni")
        .with_memory_type(MemoryType::LongTerm)
        .with_access_frequency(AccessFrequency::Hot)
        .with_identity("brand-042");

    let base = compressor.encode(&query.text).unwrap();
    let extended = DimensionExtender::default().extend_at(&base, &query, 1_771_632_000);
    let hot = [extended.with_payload(&[0.05; PAYLOAD_DIM])];
    let outcome =
        HerdOptimizer::new(herd_config()).optimize_with_history(&extended, "brand-042", &hot);

    assert_eq!(outcome.position.len(), COORDINATE_DIM);
    for slot in METADATA_SLOTS {
        assert_eq!(outcome.position[slot], extended[slot]);
    }
    assert!(outcome.convergence > 0.0 && outcome.convergence <= 1.0);
    let fitness = AnchorFitness::for_query(&extended, &hot);
    assert!(fitness.cost(&outcome.position.payload()) <= fitness.cost(&extended.payload()));
}

#[test]
fn different_identities_explore_differently() {
    let query = Coordinate::splat(0.1);
    let fitness = workload(&query);
    let opt = HerdOptimizer::new(herd_config());
    let a = opt.optimize_fitness(&query, "brand-001", &fitness);
    let b = opt.optimize_fitness(&query, "brand-002", &fitness);
    assert_ne!(a.position.as_array(), b.position.as_array());
}

proptest! {
    #[test]
    fn compress_always_yields_forty(
        values in prop::collection::vec(-10.0f64..10.0, EMBEDDING_DIM),
    ) {
        let c = MeanPoolProjection.project(&values).unwrap();
        prop_assert_eq!(c.len(), COORDINATE_DIM);
        prop_assert!(c.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn compress_rejects_other_widths(len in 0usize..2000) {
        prop_assume!(len != EMBEDDING_DIM);
        prop_assert!(MeanPoolProjection.project(&vec![0.0; len]).is_err());
    }

    #[test]
    fn extended_cluster_id_in_unit_range(
        values in prop::collection::vec(-1e6f64..1e6, COORDINATE_DIM),
        secs in 0u64..4_000_000_000,
    ) {
        let base = Coordinate::from_slice(&values).unwrap();
        let out = DimensionExtender::default().extend_at(&base, &MemoryQuery::new("q"), secs);
        prop_assert!((0.0..1.0).contains(&out[23]));
        prop_assert!((0.0..1.0).contains(&out[24]));
        for slot in PAYLOAD_SLOTS {
            prop_assert_eq!(out[slot], base[slot]);
        }
    }
}
