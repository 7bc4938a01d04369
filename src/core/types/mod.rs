//! Core data types.
//!
//! - [`Point3D`]: 3D point in millimetres
//! - [`Pose3D`]: position plus pan/tilt/roll orientation
//! - [`PathId`], [`PoseRef`]: handles into the particle path arena

mod path_id;
mod pose;

pub use path_id::{PathId, PoseRef};
pub use pose::{Point3D, Pose3D};
