//! DrishtiSLAM - synthetic corridor runner
//!
//! Drives a [`Robot`] along a simulated corridor, feeding it body velocities
//! and stereo features computed from the true pose, and logs how the best
//! path tracks the ground truth.
//!
//! # Usage
//!
//! ```bash
//! # With default config
//! cargo run --release
//!
//! # With custom config file and outputs
//! cargo run --release -- --config drishti-slam.toml --steps 40 --export-map map.pgm
//! ```

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use drishti_slam::{Pose3D, Robot, SlamConfig, StereoFeature};

// ============================================================================
// Scenario
// ============================================================================

/// Corridor side walls at x = ±CORRIDOR_HALF_WIDTH_MM.
const CORRIDOR_HALF_WIDTH_MM: f32 = 600.0;

/// End wall of the corridor.
const CORRIDOR_END_MM: f32 = 2400.0;

/// Focal length of the simulated cameras.
const FOCAL_LENGTH_PX: f32 = 160.0;

/// Stereo baseline of the simulated cameras.
const BASELINE_MM: f32 = 107.0;

const FORWARD_SPEED_MM_S: f32 = 200.0;
const STEP_SEC: f32 = 0.25;

/// Distance to the nearest corridor wall along a world heading.
fn wall_distance(x: f32, y: f32, heading: f32) -> Option<f32> {
    let (sin, cos) = heading.sin_cos();
    let mut nearest = f32::INFINITY;

    if sin > 1e-6 {
        nearest = nearest.min((CORRIDOR_HALF_WIDTH_MM - x) / sin);
    } else if sin < -1e-6 {
        nearest = nearest.min((-CORRIDOR_HALF_WIDTH_MM - x) / sin);
    }
    if cos > 1e-6 {
        nearest = nearest.min((CORRIDOR_END_MM - y) / cos);
    }

    (nearest.is_finite() && nearest > 0.0).then_some(nearest)
}

/// Stereo features the cameras would see from `pose`.
fn simulate_features(pose: &Pose3D) -> Vec<StereoFeature> {
    (-6..=6)
        .filter_map(|i| {
            let bearing = i as f32 * 0.1;
            let distance = wall_distance(pose.x, pose.y, pose.pan + bearing)?;
            let disparity = FOCAL_LENGTH_PX * BASELINE_MM / distance;
            (2.0..=40.0).contains(&disparity).then_some(StereoFeature {
                disparity,
                pan: bearing,
                tilt: 0.0,
                colour: [180, 180, 180],
            })
        })
        .collect()
}

// ============================================================================
// CLI Arguments
// ============================================================================

struct Args {
    config_path: Option<String>,
    steps: usize,
    save_ray_model: Option<String>,
    export_map: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args {
        config_path: None,
        steps: 30,
        save_ray_model: None,
        export_map: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--steps" | "-n" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse() {
                        Ok(steps) => result.steps = steps,
                        Err(_) => {
                            eprintln!("Invalid step count: {}", args[i + 1]);
                            std::process::exit(1);
                        }
                    }
                    i += 1;
                }
            }
            "--save-ray-model" => {
                if i + 1 < args.len() {
                    result.save_ray_model = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--export-map" => {
                if i + 1 < args.len() {
                    result.export_map = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("drishti-slam - distributed particle SLAM on a synthetic corridor");
    println!();
    println!("USAGE:");
    println!("    drishti-slam [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>          Configuration file (default: drishti-slam.toml)");
    println!("    -n, --steps <N>              Simulation steps (default: 30)");
    println!("        --save-ray-model <FILE>  Write the active ray model as XML");
    println!("        --export-map <FILE>      Write the best path's map as PGM");
    println!("    -h, --help                   Print help information");
    println!();
    println!("CONFIGURATION:");
    println!("    - [motion] survey_trial_poses, cull_threshold, pose_maturation, motion_noise");
    println!("    - [grid] dimension_cells, dimension_cells_vertical, cell_size_mm");
    println!("    - [robot] wheel and camera geometry");
    println!("    - [ray_model] file, integer_mode, localise_only");
}

fn load_config(args: &Args) -> SlamConfig {
    match &args.config_path {
        Some(path) => match SlamConfig::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("Failed to load config {}: {}", path, e);
                SlamConfig::default()
            }
        },
        None => {
            for path in &["drishti-slam.toml", "/etc/drishti-slam.toml"] {
                if let Ok(cfg) = SlamConfig::load(path) {
                    return cfg;
                }
            }
            SlamConfig::default()
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = parse_args();
    let config = load_config(&args);

    log::info!("drishti-slam starting");
    log::info!("  Steps: {}", args.steps);
    log::info!(
        "  Population: {} paths, cull {}%, maturation {}",
        config.motion.survey_trial_poses,
        config.motion.cull_threshold,
        config.motion.pose_maturation
    );

    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        s.store(true, Ordering::Relaxed);
    }) {
        log::warn!("Ctrl-C handler unavailable: {}", e);
    }

    if let Err(e) = run(&args, config, stop) {
        log::error!("Run failed: {}", e);
        std::process::exit(1);
    }

    log::info!("drishti-slam finished");
}

fn run(args: &Args, config: SlamConfig, stop: Arc<AtomicBool>) -> drishti_slam::Result<()> {
    let integer_mode = config.ray_model.integer_mode;
    let mut robot = Robot::new(config)?;
    robot.motion_mut().set_stop_flag(stop.clone());

    if let Some(path) = &args.save_ray_model {
        robot.ray_model().save(path, integer_mode)?;
    }

    let mut truth = Pose3D::default();
    for step in 0..args.steps {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if truth.y + FORWARD_SPEED_MM_S * STEP_SEC >= CORRIDOR_END_MM - 200.0 {
            log::info!("Reached the end of the corridor");
            break;
        }

        truth = truth.translate(0.0, FORWARD_SPEED_MM_S * STEP_SEC, 0.0);
        robot.update_from_velocities(FORWARD_SPEED_MM_S, 0.0, STEP_SEC)?;

        let rays = vec![robot.rays_from_features(0, &simulate_features(&truth))];
        let summary = robot.observe(&rays)?;

        let best = robot.best_pose();
        log::info!(
            "Step {:3}: best ({:7.1}, {:7.1}, {:6.3}) truth ({:7.1}, {:7.1}) error {:6.1}mm, {} rays{}",
            step,
            best.x,
            best.y,
            best.pan,
            truth.x,
            truth.y,
            best.distance_xy(&truth),
            rays[0].len(),
            match summary {
                Some(s) if s.interrupted => " (interrupted)",
                _ => "",
            }
        );
    }

    let trajectory = robot.best_trajectory();
    log::info!(
        "Best trajectory: {} poses, {} distilled cells",
        trajectory.len(),
        robot.grid().distilled_count()
    );

    if let Some(path) = &args.export_map {
        robot.export_map(path)?;
        log::info!("Map written to {}", path);
    }
    Ok(())
}
