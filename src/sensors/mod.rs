//! Sensor model layer.
//!
//! Turns stereo matches into probabilistic evidence.
//!
//! # Contents
//!
//! - [`evidence_ray`]: Inverse sensor model rays
//! - [`ray_model`]: Disparity to distance probability lookup and its XML form

pub mod evidence_ray;
pub mod ray_model;

pub use evidence_ray::EvidenceRay;
pub use ray_model::{RayModelLookup, RayShape};
