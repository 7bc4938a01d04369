//! Focused SLAM Benchmarks
//!
//! Benchmarks for the CPU-heavy parts of a step:
//! - Ray insertion into the multi-hypothesis grid
//! - Full predict / observe / prune cycles of the path tree
//! - Ray construction from the ray model
//!
//! Run with: `cargo bench`
//! View HTML reports in: `target/criterion/`

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use drishti_slam::{
    EvidenceRay, MotionInput, MotionModel, MotionModelConfig, OccupancyGrid, OccupancyGridConfig,
    PathId, RayModelLookup, RobotGeometry,
};

// ============================================================================
// Test Fixtures
// ============================================================================

/// A fan of rays ending on a wall 1.2m ahead.
fn wall_rays(count: usize) -> Vec<Vec<EvidenceRay>> {
    let lookup = RayModelLookup::surveyor_svs();
    let rays = (0..count)
        .filter_map(|i| {
            let pan = (i as f32 / count as f32 - 0.5) * 1.2;
            EvidenceRay::from_ray_model(&lookup, 0, 14.0, pan, 0.0, [200, 200, 200])
        })
        .map(|mut ray| {
            for v in &mut ray.vertices {
                *v = v.translate(0.0, 0.0, 300.0);
            }
            ray
        })
        .collect();
    vec![rays]
}

fn motion_config(poses: usize) -> MotionModelConfig {
    MotionModelConfig {
        survey_trial_poses: poses,
        pose_maturation: 3,
        ..Default::default()
    }
}

// ============================================================================
// Grid Benchmarks
// ============================================================================

fn bench_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(3));
    group.warm_up_time(Duration::from_secs(1));

    let rays = wall_rays(32);
    let ancestry = [PathId(1)];

    group.bench_function("insert/32_rays", |b| {
        b.iter_batched(
            || OccupancyGrid::new(OccupancyGridConfig::default()),
            |mut grid| {
                let mut cells = Vec::new();
                for (t, ray) in rays[0].iter().enumerate() {
                    black_box(grid.insert(ray, PathId(1), &ancestry, t as u32, false, &mut cells));
                }
                grid
            },
            BatchSize::LargeInput,
        )
    });

    let mut scored = OccupancyGrid::new(OccupancyGridConfig::default());
    let mut cells = Vec::new();
    for ray in &rays[0] {
        scored.insert(ray, PathId(1), &ancestry, 0, false, &mut cells);
    }
    group.bench_function("score/32_rays", |b| {
        b.iter(|| {
            let mut unused = Vec::new();
            for ray in &rays[0] {
                black_box(scored.insert(ray, PathId(1), &ancestry, 1, true, &mut unused));
            }
        })
    });

    group.finish();
}

// ============================================================================
// Path Tree Benchmarks
// ============================================================================

fn bench_path_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_tree");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(1));

    let rays = wall_rays(16);
    let input = MotionInput::BodyVelocity {
        forward: 200.0,
        angular: 0.05,
    };

    for poses in [50usize, 200] {
        group.bench_function(format!("cycle/{}_poses", poses), |b| {
            b.iter_batched(
                || {
                    (
                        MotionModel::new(motion_config(poses), RobotGeometry::default(), 7)
                            .unwrap(),
                        OccupancyGrid::new(OccupancyGridConfig::default()),
                    )
                },
                |(mut model, mut grid)| {
                    for _ in 0..5 {
                        if let Some(token) = model.predict(input, 0.25, &mut grid).unwrap() {
                            model.add_observation(token, &rays, &mut grid, false).unwrap();
                        }
                    }
                    black_box(model.best_trajectory())
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

// ============================================================================
// Sensor Benchmarks
// ============================================================================

fn bench_rays(c: &mut Criterion) {
    let mut group = c.benchmark_group("rays");
    let lookup = RayModelLookup::surveyor_svs();

    group.bench_function("from_ray_model", |b| {
        b.iter(|| {
            EvidenceRay::from_ray_model(
                black_box(&lookup),
                0,
                black_box(12.0),
                0.1,
                0.0,
                [0, 0, 0],
            )
        })
    });

    group.bench_function("surveyor_svs", |b| b.iter(RayModelLookup::surveyor_svs));

    group.finish();
}

// ============================================================================
// Main
// ============================================================================

criterion_group!(benches, bench_grid, bench_path_tree, bench_rays);

criterion_main!(benches);
