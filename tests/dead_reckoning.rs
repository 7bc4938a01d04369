//! Dead Reckoning Tests
//!
//! Synthetic encoder sequences fed through [`Robot::update_from_encoders`]
//! with motion noise disabled, so every path follows the exact kinematics:
//! - Straight driving, forwards and backwards
//! - Rotation in place
//! - Counter wraparound
//!
//! Run with: `cargo test --test dead_reckoning`

use approx::assert_relative_eq;
use drishti_slam::{MotionModelConfig, Robot, RobotGeometry, SlamConfig};
use std::f32::consts::{FRAC_PI_2, PI};

// ============================================================================
// Test Configuration
// ============================================================================

/// 100mm wheels, 200mm wheel base, 100 ticks per revolution: π mm per tick.
fn simple_config() -> SlamConfig {
    SlamConfig {
        seed: 1,
        motion: MotionModelConfig {
            survey_trial_poses: 4,
            motion_noise: [0.0; 6],
            ..Default::default()
        },
        robot: RobotGeometry {
            wheel_diameter_mm: 100.0,
            wheel_base_mm: 200.0,
            counts_per_revolution: 100,
            camera_height_mm: 250.0,
        },
        ..Default::default()
    }
}

fn robot_at(left: u16, right: u16) -> Robot {
    let mut robot = Robot::new(simple_config()).unwrap();
    assert!(!robot.update_from_encoders(left, right, 0.1).unwrap());
    robot
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_straight_one_revolution() {
    let mut robot = robot_at(0, 0);
    assert!(robot.update_from_encoders(100, 100, 0.5).unwrap());

    let pose = robot.best_pose();
    assert_relative_eq!(pose.x, 0.0, epsilon = 1e-3);
    assert_relative_eq!(pose.y, 100.0 * PI, epsilon = 1e-2);
    assert_relative_eq!(pose.pan, 0.0, epsilon = 1e-6);
}

#[test]
fn test_reverse_driving() {
    let mut robot = robot_at(500, 500);
    robot.update_from_encoders(450, 450, 1.0).unwrap();

    let pose = robot.best_pose();
    assert_relative_eq!(pose.y, -50.0 * PI, epsilon = 1e-2);
}

#[test]
fn test_rotation_in_place() {
    let mut robot = robot_at(0, 0);
    // left forward, right backward: clockwise towards +X
    robot.update_from_encoders(50, 65486, 1.0).unwrap();

    let pose = robot.best_pose();
    assert_relative_eq!(pose.x, 0.0, epsilon = 1e-3);
    assert_relative_eq!(pose.y, 0.0, epsilon = 1e-3);
    assert_relative_eq!(pose.pan, FRAC_PI_2, epsilon = 1e-4);
}

#[test]
fn test_turn_then_drive() {
    let mut robot = robot_at(0, 0);
    robot.update_from_encoders(100, 100, 1.0).unwrap();
    robot.update_from_encoders(150, 50, 1.0).unwrap();
    robot.update_from_encoders(250, 150, 1.0).unwrap();

    let pose = robot.best_pose();
    assert_relative_eq!(pose.x, 100.0 * PI, epsilon = 1e-2);
    assert_relative_eq!(pose.y, 100.0 * PI, epsilon = 1e-2);
    assert_relative_eq!(pose.pan, FRAC_PI_2, epsilon = 1e-4);

    let trajectory = robot.best_trajectory();
    assert_eq!(trajectory.len(), 4);
}

#[test]
fn test_counter_wraparound() {
    let mut robot = robot_at(65486, 65486);
    robot.update_from_encoders(50, 50, 1.0).unwrap();

    let pose = robot.best_pose();
    assert_relative_eq!(pose.y, 100.0 * PI, epsilon = 1e-2);
}

#[test]
fn test_non_positive_dt_is_ignored() {
    let mut robot = robot_at(0, 0);
    assert!(!robot.update_from_encoders(100, 100, 0.0).unwrap());
    assert!(!robot.update_from_encoders(200, 200, -1.0).unwrap());
    assert_eq!(robot.motion().time_step(), 0);
}
