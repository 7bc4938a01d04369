//! DrishtiSLAM - Distributed particle SLAM for stereo vision robots
//!
//! # Architecture
//!
//! The crate is organized into 4 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │               (robot, configuration)                │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │             (localization, mapping)                 │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Sensor processing
//! │            (evidence rays, ray model)               │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │             (types, math, errors)                   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Overview
//!
//! Every particle is a path in a branching tree. Paths share a single
//! occupancy grid, and each cell holds per-path hypotheses that a path only
//! sees through its own ancestry. Once all live paths descend from one
//! ancestor, that ancestor's hypotheses are distilled into the grid for
//! good.
//!
//! A step is predict, observe, prune:
//! - [`MotionModel::predict`] samples a noisy velocity motion for each path
//! - [`MotionModel::add_observation`] projects stereo [`EvidenceRay`]s from
//!   each path's pose and scores them against the grid
//! - pruning culls the worst mature paths, collects garbage and replaces the
//!   survivors with a new generation forked from the mature ones

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Sensor processing (depends on core)
// ============================================================================
pub mod sensors;

// ============================================================================
// Layer 3: Algorithms (depends on core, sensors)
// ============================================================================
pub mod algorithms;

// ============================================================================
// Layer 4: Robot engine (depends on core, sensors, algorithms)
// ============================================================================
pub mod engine;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use core::error::{Result, SlamError};
pub use core::math;
pub use core::types::{PathId, Point3D, Pose3D, PoseRef};

// Sensors
pub use sensors::{EvidenceRay, RayModelLookup, RayShape};

// Algorithms - Mapping
pub use algorithms::mapping::{OccupancyGrid, OccupancyGridConfig, TreeBounds};

// Algorithms - Localization
pub use algorithms::localization::{
    MotionInput, MotionModel, MotionModelConfig, ObservationSummary, ParticlePath, ParticlePose,
    PredictionToken, ResetMode, RobotGeometry, StepPhase,
};

// Engine
pub use engine::{RayModelSection, Robot, SlamConfig, StereoFeature};
