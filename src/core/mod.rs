//! Core foundation layer.
//!
//! This is the bottom layer of the SLAM stack with no internal dependencies.
//!
//! # Contents
//!
//! - [`types`]: Points, poses and path handles
//! - [`math`]: Angle wrapping and log-odds helpers
//! - [`error`]: Crate error type

pub mod error;
pub mod math;
pub mod types;
