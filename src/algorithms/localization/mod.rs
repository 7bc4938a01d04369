//! Localization module.
//!
//! A distributed particle filter: every particle is a path in a branching
//! tree, and each path sees the map through its own ancestry.
//!
//! # Components
//!
//! - [`MotionModel`]: Owns the path tree, predicts, scores and prunes it
//! - [`ParticlePath`]: One hypothesised trajectory with its score
//! - [`ParticlePose`]: One pose of a path and the cells it observed
//! - [`MotionModelConfig`], [`RobotGeometry`]: Settings
//!
//! # Example
//!
//! ```
//! use drishti_slam::algorithms::localization::{
//!     MotionInput, MotionModel, MotionModelConfig, RobotGeometry,
//! };
//! use drishti_slam::algorithms::mapping::{OccupancyGrid, OccupancyGridConfig};
//!
//! let mut grid = OccupancyGrid::new(OccupancyGridConfig::default());
//! let mut model =
//!     MotionModel::new(MotionModelConfig::default(), RobotGeometry::default(), 42)?;
//!
//! let input = MotionInput::BodyVelocity { forward: 100.0, angular: 0.0 };
//! if let Some(token) = model.predict(input, 0.1, &mut grid)? {
//!     model.add_observation(token, &[], &mut grid, false)?;
//! }
//! assert_eq!(model.poses().len(), 200);
//! # Ok::<(), drishti_slam::SlamError>(())
//! ```

mod config;
mod motion_model;
mod particle_path;
mod particle_pose;

pub use crate::core::types::{PathId, PoseRef};
pub use config::{MotionModelConfig, RobotGeometry};
pub use motion_model::{
    MotionInput, MotionModel, ObservationSummary, PredictionToken, ResetMode, StepPhase,
};
pub use particle_path::ParticlePath;
pub use particle_pose::ParticlePose;
