//! Core SLAM algorithms layer.
//!
//! # Contents
//!
//! - [`mapping`]: Multi-hypothesis occupancy grid
//! - [`localization`]: Path tree particle filter (motion model, paths, poses)

pub mod localization;
pub mod mapping;
