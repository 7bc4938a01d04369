//! Robot-level glue: odometry in, rays in, best estimate out.
//!
//! [`Robot`] owns the motion model, the shared grid and the ray model, and
//! keeps the prediction token between an odometry update and the matching
//! observation.

use std::path::Path;

use crate::algorithms::localization::{
    MotionInput, MotionModel, ObservationSummary, PredictionToken, ResetMode,
};
use crate::algorithms::mapping::OccupancyGrid;
use crate::core::error::Result;
use crate::core::types::{PathId, Pose3D};
use crate::sensors::{EvidenceRay, RayModelLookup};

use super::config::SlamConfig;

/// A stereo feature seen by one camera pair, relative to the robot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoFeature {
    /// Disparity in pixels
    pub disparity: f32,
    /// Bearing, positive clockwise from straight ahead
    pub pan: f32,
    /// Elevation, positive upwards
    pub tilt: f32,
    pub colour: [u8; 3],
}

/// SLAM robot: motion model, grid and sensor model together.
#[derive(Debug)]
pub struct Robot {
    config: SlamConfig,
    motion: MotionModel,
    grid: OccupancyGrid,
    ray_model: RayModelLookup,
    pending: Option<PredictionToken>,
    last_ticks: Option<(u16, u16)>,
}

impl Robot {
    /// Build a robot from configuration.
    ///
    /// Loads the configured ray model file, or uses the built-in table.
    pub fn new(config: SlamConfig) -> Result<Self> {
        config.validate()?;

        let ray_model = match &config.ray_model.file {
            Some(file) => {
                let mut lookup = RayModelLookup::new(config.grid.cell_size_mm);
                lookup.load(file)?;
                lookup
            }
            None => RayModelLookup::surveyor_svs(),
        };

        let motion = MotionModel::new(config.motion.clone(), config.robot, config.seed)?;
        let grid = OccupancyGrid::new(config.grid.clone());

        log::info!(
            "Robot ready: {} trial poses, {}x{}x{} grid at {}mm, {} ray model rows",
            config.motion.survey_trial_poses,
            config.grid.dimension_cells,
            config.grid.dimension_cells,
            config.grid.dimension_cells_vertical,
            config.grid.cell_size_mm,
            ray_model.rows()
        );

        Ok(Self {
            config,
            motion,
            grid,
            ray_model,
            pending: None,
            last_ticks: None,
        })
    }

    /// Odometry from absolute wheel encoder counters.
    ///
    /// The first call only records the counters. Counter wraparound is
    /// handled. Returns whether a prediction was made.
    pub fn update_from_encoders(&mut self, left: u16, right: u16, dt: f32) -> Result<bool> {
        let previous = self.last_ticks.replace((left, right));
        let Some((prev_left, prev_right)) = previous else {
            return Ok(false);
        };
        if !(dt > 0.0) {
            return Ok(false);
        }

        let radians_per_tick =
            std::f32::consts::TAU / self.config.robot.counts_per_revolution as f32;
        let left_rate = tick_delta(left, prev_left) as f32 * radians_per_tick / dt;
        let right_rate = tick_delta(right, prev_right) as f32 * radians_per_tick / dt;

        self.apply_motion(
            MotionInput::WheelAngularVelocity {
                left: left_rate,
                right: right_rate,
            },
            dt,
        )
    }

    /// Odometry from body velocities (mm/s, rad/s clockwise).
    pub fn update_from_velocities(&mut self, forward: f32, angular: f32, dt: f32) -> Result<bool> {
        self.apply_motion(MotionInput::BodyVelocity { forward, angular }, dt)
    }

    fn apply_motion(&mut self, input: MotionInput, dt: f32) -> Result<bool> {
        match self.motion.predict(input, dt, &mut self.grid)? {
            Some(token) => {
                if self.pending.replace(token).is_some() {
                    log::debug!("Previous prediction was never observed");
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Map from a pose known by other means.
    ///
    /// The best path's map is kept, the population collapses onto `pose`
    /// and `rays` are added to the map as seen from there.
    pub fn update_from_known_position(
        &mut self,
        pose: Pose3D,
        rays: &[Vec<EvidenceRay>],
    ) -> Result<ObservationSummary> {
        self.pending = None;
        self.motion.commit_best_path(&mut self.grid);
        self.motion.set_current_robot_pose(pose);
        self.motion.reset(ResetMode::Egocentric, &mut self.grid);

        // a stationary step keeps every path exactly on `pose`
        let input = MotionInput::BodyVelocity {
            forward: 0.0,
            angular: 0.0,
        };
        let Some(token) = self.motion.predict(input, 1.0, &mut self.grid)? else {
            return Ok(ObservationSummary::default());
        };
        self.motion
            .add_observation(token, rays, &mut self.grid, false)
    }

    /// Score the pending prediction against robot-local rays.
    ///
    /// Returns `None` when no prediction is waiting for an observation.
    pub fn observe(&mut self, rays: &[Vec<EvidenceRay>]) -> Result<Option<ObservationSummary>> {
        let Some(token) = self.pending.take() else {
            log::debug!("Observation without a pending prediction ignored");
            return Ok(None);
        };
        let summary = self.motion.add_observation(
            token,
            rays,
            &mut self.grid,
            self.config.ray_model.localise_only,
        )?;
        Ok(Some(summary))
    }

    /// Relocalise globally by spreading the population over the grid.
    pub fn relocalise(&mut self) {
        self.pending = None;
        self.motion.reset(ResetMode::MonteCarlo, &mut self.grid);
    }

    /// Build robot-local rays for one camera from its stereo features.
    ///
    /// Features whose disparity has no ray model row are dropped.
    pub fn rays_from_features(&self, camera_id: usize, features: &[StereoFeature]) -> Vec<EvidenceRay> {
        let height = self.config.robot.camera_height_mm;
        features
            .iter()
            .filter_map(|f| {
                EvidenceRay::from_ray_model(
                    &self.ray_model,
                    camera_id,
                    f.disparity,
                    f.pan,
                    f.tilt,
                    f.colour,
                )
            })
            .map(|mut ray| {
                for v in &mut ray.vertices {
                    *v = v.translate(0.0, 0.0, height);
                }
                ray
            })
            .collect()
    }

    /// Best pose estimate: the current pose of the best path.
    pub fn best_pose(&self) -> Pose3D {
        self.motion
            .best_path()
            .map(|p| p.current_pose().pose)
            .unwrap_or_else(|| self.motion.current_robot_pose())
    }

    /// Trajectory of the best path, oldest first.
    pub fn best_trajectory(&self) -> Vec<Pose3D> {
        self.motion.best_trajectory()
    }

    /// Ancestry of the best path, for map queries.
    pub fn best_ancestry(&self) -> Vec<PathId> {
        self.motion
            .best_path_id()
            .map(|id| self.motion.ancestry(id))
            .unwrap_or_default()
    }

    /// Save the map as seen by the best path.
    pub fn export_map<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.grid.save_pgm(path, &self.best_ancestry())
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn motion(&self) -> &MotionModel {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut MotionModel {
        &mut self.motion
    }

    pub fn ray_model(&self) -> &RayModelLookup {
        &self.ray_model
    }

    pub fn config(&self) -> &SlamConfig {
        &self.config
    }
}

/// Signed tick difference with 16-bit wraparound.
#[inline]
fn tick_delta(current: u16, previous: u16) -> i32 {
    current.wrapping_sub(previous) as i16 as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::localization::{MotionModelConfig, RobotGeometry};
    use approx::assert_relative_eq;

    fn quiet_config() -> SlamConfig {
        SlamConfig {
            seed: 3,
            motion: MotionModelConfig {
                survey_trial_poses: 8,
                cull_threshold: 50,
                pose_maturation: 2,
                motion_noise: [0.0; 6],
            },
            robot: RobotGeometry {
                wheel_diameter_mm: 100.0,
                wheel_base_mm: 200.0,
                counts_per_revolution: 100,
                camera_height_mm: 300.0,
            },
            ..Default::default()
        }
    }

    fn features() -> Vec<StereoFeature> {
        (-2..=2)
            .map(|i| StereoFeature {
                disparity: 12.0,
                pan: i as f32 * 0.1,
                tilt: 0.0,
                colour: [200, 200, 200],
            })
            .collect()
    }

    #[test]
    fn test_tick_delta_wraps() {
        assert_eq!(tick_delta(10, 5), 5);
        assert_eq!(tick_delta(2, 65534), 4);
        assert_eq!(tick_delta(65534, 2), -4);
    }

    #[test]
    fn test_first_encoder_reading_only_initialises() {
        let mut robot = Robot::new(quiet_config()).unwrap();
        assert!(!robot.update_from_encoders(1000, 1000, 0.1).unwrap());
        assert!(robot.observe(&[]).unwrap().is_none());
    }

    #[test]
    fn test_encoders_drive_straight() {
        let mut robot = Robot::new(quiet_config()).unwrap();
        robot.update_from_encoders(65500, 65500, 0.1).unwrap();
        // 100 ticks across the wrap: one revolution, 100π mm
        assert!(robot.update_from_encoders(64, 64, 1.0).unwrap());

        let pose = robot.best_pose();
        assert_relative_eq!(pose.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(pose.y, 100.0 * std::f32::consts::PI, epsilon = 1e-2);
    }

    #[test]
    fn test_rays_from_features_sit_at_camera_height() {
        let robot = Robot::new(quiet_config()).unwrap();
        let rays = robot.rays_from_features(0, &features());
        assert_eq!(rays.len(), 5);
        for ray in &rays {
            assert_relative_eq!(ray.vertices[0].z, 300.0, epsilon = 1e-3);
            assert_relative_eq!(ray.vertices[1].z, 300.0, epsilon = 1e-3);
            assert_eq!(ray.observed_from, crate::core::types::Point3D::default());
        }

        let none = robot.rays_from_features(
            0,
            &[StereoFeature {
                disparity: 500.0,
                pan: 0.0,
                tilt: 0.0,
                colour: [0, 0, 0],
            }],
        );
        assert!(none.is_empty());
    }

    #[test]
    fn test_known_position_maps_at_pose() {
        let mut robot = Robot::new(quiet_config()).unwrap();
        let rays = vec![robot.rays_from_features(0, &features())];
        let pose = Pose3D::planar(200.0, -100.0, 0.3);

        let summary = robot.update_from_known_position(pose, &rays).unwrap();
        assert_eq!(summary.scored + summary.skipped, 8);
        assert!(robot.grid().hypothesis_count() > 0);

        let best = robot.best_pose();
        assert_relative_eq!(best.x, 200.0, epsilon = 1e-3);
        assert_relative_eq!(best.y, -100.0, epsilon = 1e-3);
        assert_relative_eq!(best.pan, 0.3, epsilon = 1e-5);
    }

    #[test]
    fn test_observe_consumes_pending_prediction() {
        let mut robot = Robot::new(quiet_config()).unwrap();
        let rays = vec![robot.rays_from_features(0, &features())];

        assert!(robot.update_from_velocities(50.0, 0.0, 0.5).unwrap());
        assert!(robot.observe(&rays).unwrap().is_some());
        assert!(robot.observe(&rays).unwrap().is_none());

        assert!(!robot.update_from_velocities(50.0, 0.0, 0.0).unwrap());
    }

    #[test]
    fn test_missing_ray_model_file_fails() {
        let mut config = quiet_config();
        config.ray_model.file = Some("/nonexistent/rays.xml".to_string());
        assert!(Robot::new(config).is_err());
    }
}
