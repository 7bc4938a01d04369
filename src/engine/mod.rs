//! SLAM orchestration layer.
//!
//! Ties the motion model, the shared grid and the ray model into one robot.
//!
//! # Contents
//!
//! - [`Robot`]: Odometry and stereo observations in, best pose and map out
//! - [`SlamConfig`]: TOML configuration for the whole stack

mod config;
mod robot;

pub use config::{RayModelSection, SlamConfig};
pub use robot::{Robot, StereoFeature};
