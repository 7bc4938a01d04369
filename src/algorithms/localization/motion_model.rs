//! Path tree motion model.
//!
//! Owns the population of candidate trajectories and steps it through a
//! predict / observe / prune cycle:
//!
//! ```text
//! Uninitialised --reset--> AwaitingObservation --predict--> (token)
//!        ^                        ^                            |
//!        |                        |                     add_observation
//!      reset                    prune                          v
//!        +------------------- Evaluated <----------------------+
//! ```
//!
//! Prediction samples the differential drive velocity motion model
//! (Probabilistic Robotics, `sample_motion_model_velocity`). Observation
//! scores every live path against the shared grid through its ancestry.
//! Pruning sorts, culls the weakest mature paths, garbage collects dead
//! branches, distills a common ancestor once every live path descends from
//! it, and replaces the survivors with a new generation forked from the
//! mature ones.

use std::collections::{BTreeMap, BTreeSet};
use std::f32::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::algorithms::mapping::{OccupancyGrid, TreeBounds};
use crate::core::error::{Result, SlamError};
use crate::core::math::{circular_mean, wrap_angle};
use crate::core::types::{PathId, Pose3D};
use crate::sensors::EvidenceRay;

use super::config::{MotionModelConfig, RobotGeometry};
use super::particle_path::ParticlePath;

/// Angular velocity below which motion is treated as a straight line.
const STRAIGHT_THRESHOLD: f32 = 1e-6;

/// How the population is re-created by [`MotionModel::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Every path starts at the current robot pose.
    Egocentric,
    /// Paths are spread uniformly over the grid and all headings.
    MonteCarlo,
}

/// Odometry input for one prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionInput {
    /// Wheel angular velocities in rad/s.
    WheelAngularVelocity { left: f32, right: f32 },
    /// Forward velocity in mm/s and pan rate in rad/s (positive = clockwise).
    BodyVelocity { forward: f32, angular: f32 },
}

/// Where the model is in the step cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Uninitialised,
    AwaitingObservation,
    Evaluated,
}

/// Proof that a prediction happened; consumed by [`MotionModel::add_observation`].
///
/// A token from an earlier prediction, or from before a reset, is rejected,
/// so an observation can only ever be scored against the poses it was meant
/// for.
#[must_use = "pass the token to add_observation"]
#[derive(Debug, PartialEq, Eq)]
pub struct PredictionToken {
    time_step: u32,
    epoch: u64,
}

impl PredictionToken {
    pub fn time_step(&self) -> u32 {
        self.time_step
    }
}

/// Outcome of scoring one observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObservationSummary {
    /// Paths whose score was updated.
    pub scored: usize,
    /// Paths that met no occupancy evidence.
    pub skipped: usize,
    /// Scoring stopped early through the stop flag.
    pub interrupted: bool,
}

/// Particle path tree with a velocity motion model.
#[derive(Debug)]
pub struct MotionModel {
    config: MotionModelConfig,
    geometry: RobotGeometry,
    rng: StdRng,

    /// Every retained path: the live population plus their ancestors.
    paths: BTreeMap<PathId, ParticlePath>,
    /// Live population, sorted by score after each prune.
    poses: Vec<PathId>,
    best_path: Option<PathId>,
    next_path_id: u64,

    time_step: u32,
    /// Bumped by every reset; tokens from an older epoch are stale.
    epoch: u64,
    phase: StepPhase,

    current_robot_pose: Pose3D,
    current_robot_path_score: f32,
    tree_bounds: Option<TreeBounds>,
    scan_match_pan: Option<f32>,

    /// Poses of ancestors that have been distilled into the grid.
    settled_trajectory: Vec<Pose3D>,

    forward_velocity: f32,
    angular_velocity_pan: f32,

    stop: Option<Arc<AtomicBool>>,
}

impl MotionModel {
    /// Create a model. A `seed` of 0 draws one from the OS.
    pub fn new(config: MotionModelConfig, geometry: RobotGeometry, seed: u64) -> Result<Self> {
        config.validate()?;
        geometry.validate()?;

        let rng = if seed == 0 {
            StdRng::from_os_rng()
        } else {
            StdRng::seed_from_u64(seed)
        };

        Ok(Self {
            config,
            geometry,
            rng,
            paths: BTreeMap::new(),
            poses: Vec::new(),
            best_path: None,
            next_path_id: 1,
            time_step: 0,
            epoch: 0,
            phase: StepPhase::Uninitialised,
            current_robot_pose: Pose3D::default(),
            current_robot_path_score: 0.0,
            tree_bounds: None,
            scan_match_pan: None,
            settled_trajectory: Vec::new(),
            forward_velocity: 0.0,
            angular_velocity_pan: 0.0,
            stop: None,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &MotionModelConfig {
        &self.config
    }

    pub fn geometry(&self) -> &RobotGeometry {
        &self.geometry
    }

    /// Flag checked between paths while scoring; set it to abandon the step.
    pub fn set_stop_flag(&mut self, stop: Arc<AtomicBool>) {
        self.stop = Some(stop);
    }

    /// Heading estimate from scan matching, used instead of each path's own
    /// pan for the next prediction. Cleared by every prune.
    pub fn set_scan_match_pan(&mut self, pan: Option<f32>) {
        self.scan_match_pan = pan.map(wrap_angle);
    }

    /// Override the robot pose used by the next egocentric reset.
    pub fn set_current_robot_pose(&mut self, pose: Pose3D) {
        self.current_robot_pose = pose;
    }

    fn allocate_path_id(&mut self) -> PathId {
        let id = PathId(self.next_path_id);
        self.next_path_id += 1;
        id
    }

    // ------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------

    /// Discard every hypothesis and seed a fresh population.
    pub fn reset(&mut self, mode: ResetMode, grid: &mut OccupancyGrid) {
        if mode == ResetMode::Egocentric {
            self.settled_trajectory = self.best_trajectory();
        } else {
            self.settled_trajectory.clear();
        }

        for path in self.paths.values_mut() {
            path.remove(grid);
        }
        self.paths.clear();
        self.poses.clear();
        self.tree_bounds = None;
        self.scan_match_pan = None;
        self.epoch = self.epoch.wrapping_add(1);

        let origin = self.current_robot_pose;
        let (min, max) = grid.extent_mm();
        for _ in 0..self.config.survey_trial_poses {
            let pose = match mode {
                ResetMode::Egocentric => origin,
                ResetMode::MonteCarlo => Pose3D::new(
                    self.rng.random_range(min..max),
                    self.rng.random_range(min..max),
                    origin.z,
                    self.rng.random_range(-PI..PI),
                    0.0,
                    0.0,
                ),
            };
            let id = self.allocate_path_id();
            self.paths
                .insert(id, ParticlePath::new(id, pose, self.time_step));
            self.poses.push(id);
        }

        self.best_path = self.poses.first().copied();
        self.current_robot_path_score = 0.0;
        self.phase = StepPhase::AwaitingObservation;

        log::info!(
            "Reset ({:?}): {} paths at time step {}",
            mode,
            self.poses.len(),
            self.time_step
        );
    }

    /// Distill the best path's whole ancestry into the grid.
    ///
    /// What that lineage observed survives a following reset. Returns the
    /// number of hypotheses folded.
    pub fn commit_best_path(&mut self, grid: &mut OccupancyGrid) -> usize {
        let Some(best) = self.best_path else {
            return 0;
        };
        let mut folded = 0;
        for id in self.ancestry(best) {
            if let Some(path) = self.paths.get_mut(&id) {
                folded += path.distill(grid);
            }
        }
        log::debug!("Committed best path {}: {} hypotheses", best, folded);
        folded
    }

    // ------------------------------------------------------------------
    // Predict
    // ------------------------------------------------------------------

    /// Advance every live path by one noisy motion step.
    ///
    /// Returns `Ok(None)` without touching anything when `time_elapsed_sec`
    /// is not positive. Resets egocentrically on first use and prunes first
    /// when the previous observation has been scored.
    pub fn predict(
        &mut self,
        input: MotionInput,
        time_elapsed_sec: f32,
        grid: &mut OccupancyGrid,
    ) -> Result<Option<PredictionToken>> {
        if !(time_elapsed_sec > 0.0) {
            return Ok(None);
        }
        if self.phase == StepPhase::Uninitialised {
            self.reset(ResetMode::Egocentric, grid);
        }
        if self.phase == StepPhase::Evaluated {
            self.prune(grid)?;
        }

        let (forward, angular) = match input {
            MotionInput::WheelAngularVelocity { left, right } => {
                let radius = self.geometry.wheel_radius_mm();
                (
                    (left + right) / 2.0 * radius,
                    (left - right) * radius / self.geometry.wheel_base_mm,
                )
            }
            MotionInput::BodyVelocity { forward, angular } => (forward, angular),
        };
        self.forward_velocity = forward;
        self.angular_velocity_pan = angular;

        self.time_step = self.time_step.wrapping_add(1);

        for &id in &self.poses {
            let Some(path) = self.paths.get_mut(&id) else {
                continue;
            };
            let pose = sample_motion_model_velocity(
                &mut self.rng,
                &self.config.motion_noise,
                &path.current_pose().pose,
                forward,
                angular,
                time_elapsed_sec,
                self.scan_match_pan,
            );
            path.add(pose, self.time_step);
        }

        log::trace!(
            "Predicted {} paths: v={:.1}mm/s w={:.3}rad/s dt={:.3}s",
            self.poses.len(),
            forward,
            angular,
            time_elapsed_sec
        );

        self.phase = StepPhase::AwaitingObservation;
        Ok(Some(PredictionToken {
            time_step: self.time_step,
            epoch: self.epoch,
        }))
    }

    // ------------------------------------------------------------------
    // Observe
    // ------------------------------------------------------------------

    /// Score the current pose of every live path against `rays`.
    ///
    /// `rays` holds one robot-local list per camera.
    pub fn add_observation(
        &mut self,
        token: PredictionToken,
        rays: &[Vec<EvidenceRay>],
        grid: &mut OccupancyGrid,
        localise_only: bool,
    ) -> Result<ObservationSummary> {
        if token.time_step != self.time_step
            || token.epoch != self.epoch
            || self.phase == StepPhase::Uninitialised
        {
            return Err(SlamError::StaleObservation {
                issued: token.time_step,
                current: self.time_step,
            });
        }

        let mut summary = ObservationSummary::default();
        for i in 0..self.poses.len() {
            if self.stop.as_ref().is_some_and(|s| s.load(Ordering::Relaxed)) {
                summary.interrupted = true;
                break;
            }

            let id = self.poses[i];
            let ancestry = self.ancestry(id);
            let Some(path) = self.paths.get_mut(&id) else {
                continue;
            };
            match path
                .current_pose_mut()
                .add_observation(rays, grid, &ancestry, localise_only)
            {
                Some(score) => {
                    path.add_score(score);
                    summary.scored += 1;
                }
                None => summary.skipped += 1,
            }
        }

        if summary.interrupted {
            log::warn!(
                "Observation interrupted after {} of {} paths",
                summary.scored + summary.skipped,
                self.poses.len()
            );
        }
        log::debug!(
            "Observation at step {}: {} scored, {} without evidence",
            self.time_step,
            summary.scored,
            summary.skipped
        );

        self.phase = StepPhase::Evaluated;
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Prune
    // ------------------------------------------------------------------

    /// Sort, cull, garbage collect and regenerate the population.
    pub fn prune(&mut self, grid: &mut OccupancyGrid) -> Result<()> {
        if self.phase != StepPhase::Evaluated {
            return Err(SlamError::NotEvaluated);
        }
        if self.poses.is_empty() {
            return Err(SlamError::PopulationCollapse(
                "no live paths before culling".to_string(),
            ));
        }

        self.sort_poses();
        self.best_path = self.poses.first().copied();

        let culled = self.cull(grid)?;
        let (swept, distilled) = self.collect_garbage(grid);

        if let Some(best) = self.best_path.and_then(|id| self.paths.get(&id)) {
            self.current_robot_pose = best.current_pose().pose;
            self.current_robot_path_score = best.total_score();
        }

        let forked = self.regenerate(grid);
        self.scan_match_pan = None;
        self.phase = StepPhase::AwaitingObservation;

        log::debug!(
            "Pruned: culled {}, swept {}, distilled {}, forked {}, live {}, retained {}",
            culled,
            swept,
            distilled,
            forked,
            self.poses.len(),
            self.paths.len()
        );
        Ok(())
    }

    /// Stable sort by descending total score, tracking the tree bounds.
    fn sort_poses(&mut self) {
        let paths = &self.paths;
        self.poses.sort_by(|a, b| {
            let score = |id: &PathId| paths.get(id).map_or(f32::MIN, |p| p.total_score());
            score(b).total_cmp(&score(a))
        });

        let mut bounds: Option<TreeBounds> = None;
        for pose in self.paths.values().flat_map(|p| p.poses()) {
            let (x, y) = (pose.pose.x, pose.pose.y);
            match bounds.as_mut() {
                Some(b) => b.expand_to_include(x, y),
                None => bounds = Some(TreeBounds::at(x, y)),
            }
        }
        self.tree_bounds = bounds;
    }

    /// Remove mature paths ranked after the cull index. Returns how many.
    fn cull(&mut self, grid: &mut OccupancyGrid) -> Result<usize> {
        let n = self.poses.len();
        if n <= 1 {
            return Ok(0);
        }

        let threshold = self.config.cull_threshold.min(100) as usize;
        let cull_index = ((100 - threshold) * n / 100).min(n - 2);

        let mut kept = Vec::with_capacity(n);
        let mut removed = Vec::new();
        for (rank, &id) in self.poses.iter().enumerate() {
            let mature = self
                .paths
                .get(&id)
                .is_some_and(|p| p.is_mature(self.config.pose_maturation));
            if rank > cull_index && mature {
                removed.push(id);
            } else {
                kept.push(id);
            }
        }
        self.poses = kept;

        for &id in &removed {
            self.destroy_path(id, grid);
        }

        if self.poses.is_empty() {
            return Err(SlamError::PopulationCollapse(
                "culling removed every path".to_string(),
            ));
        }
        Ok(removed.len())
    }

    /// Drop a path from the arena, retracting its hypotheses.
    fn destroy_path(&mut self, id: PathId, grid: &mut OccupancyGrid) {
        let Some(mut path) = self.paths.remove(&id) else {
            return;
        };
        path.remove(grid);
        if let Some(parent) = path
            .branch_pose()
            .and_then(|b| self.paths.get_mut(&b.path))
        {
            parent.child_removed();
        }
    }

    /// Sweep branches with no live descendant and distill a shared root.
    ///
    /// Returns `(swept, distilled)` path counts.
    fn collect_garbage(&mut self, grid: &mut OccupancyGrid) -> (usize, usize) {
        let mut reachable = BTreeSet::new();
        for &id in &self.poses {
            let mut current = Some(id);
            while let Some(c) = current {
                if !reachable.insert(c) {
                    break;
                }
                current = self.parent_of(c);
            }
        }

        let dead: Vec<PathId> = self
            .paths
            .keys()
            .filter(|id| !reachable.contains(*id))
            .copied()
            .collect();
        for &id in &dead {
            self.destroy_path(id, grid);
        }

        let mut distilled = 0;
        loop {
            let roots: BTreeSet<PathId> = self.poses.iter().map(|&id| self.root_of(id)).collect();
            let Some(&root) = roots.first() else {
                break;
            };
            if roots.len() != 1 || self.poses.contains(&root) {
                break;
            }
            let Some(mut path) = self.paths.remove(&root) else {
                break;
            };
            path.distill(grid);

            let children: Vec<PathId> = self
                .paths
                .values()
                .filter(|p| p.branch_pose().is_some_and(|b| b.path == root))
                .map(|p| p.id())
                .collect();
            // children start with a copy of the pose they branched from
            let branch_index = children
                .iter()
                .filter_map(|id| self.paths.get(id)?.branch_pose())
                .map(|b| b.index)
                .min()
                .unwrap_or(path.len());
            self.settled_trajectory
                .extend(path.poses()[..branch_index.min(path.len())].iter().map(|p| p.pose));

            for id in children {
                if let Some(child) = self.paths.get_mut(&id) {
                    child.sever_branch();
                }
            }
            distilled += 1;
        }

        (dead.len(), distilled)
    }

    /// Replace the survivors with a new generation forked from the mature ones.
    ///
    /// Draws a random survivor up to `4 * survey_trial_poses` times and forks
    /// every mature draw until the population is full. Once any child exists
    /// the whole old generation leaves the population; survivors that never
    /// forked are destroyed. With no child the survivors carry on unchanged.
    /// Returns the number of children created.
    fn regenerate(&mut self, grid: &mut OccupancyGrid) -> usize {
        let target = self.config.survey_trial_poses;
        let survivors = self.poses.clone();
        if target == 0 || survivors.is_empty() {
            return 0;
        }

        let mut children: Vec<PathId> = Vec::with_capacity(target);
        for _ in 0..4 * target {
            if children.len() >= target {
                break;
            }
            let parent_id = survivors[self.rng.random_range(0..survivors.len())];
            let mature = self
                .paths
                .get(&parent_id)
                .is_some_and(|p| p.is_mature(self.config.pose_maturation));
            if !mature {
                continue;
            }

            let child_id = self.allocate_path_id();
            let time_step = self.time_step;
            let Some(parent) = self.paths.get_mut(&parent_id) else {
                continue;
            };
            let child = parent.fork(child_id, time_step);
            self.paths.insert(child_id, child);
            children.push(child_id);
        }

        if children.is_empty() {
            return 0;
        }

        let paths = &self.paths;
        children.sort_by(|a, b| {
            let score = |id: &PathId| paths.get(id).map_or(f32::MIN, |p| p.total_score());
            score(b).total_cmp(&score(a))
        });
        let forked = children.len();
        self.poses = children;
        self.best_path = self.poses.first().copied();

        for id in survivors {
            if self.paths.get(&id).is_some_and(|p| p.total_children() == 0) {
                self.destroy_path(id, grid);
            }
        }
        forked
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    fn parent_of(&self, id: PathId) -> Option<PathId> {
        self.paths.get(&id)?.branch_pose().map(|b| b.path)
    }

    fn root_of(&self, id: PathId) -> PathId {
        let mut root = id;
        while let Some(parent) = self.parent_of(root) {
            root = parent;
        }
        root
    }

    /// The path itself followed by every retained ancestor, nearest first.
    pub fn ancestry(&self, id: PathId) -> Vec<PathId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Live population, best first after a prune.
    pub fn poses(&self) -> &[PathId] {
        &self.poses
    }

    pub fn path(&self, id: PathId) -> Option<&ParticlePath> {
        self.paths.get(&id)
    }

    /// Every retained path, live or ancestor.
    pub fn paths(&self) -> impl Iterator<Item = &ParticlePath> {
        self.paths.values()
    }

    pub fn best_path_id(&self) -> Option<PathId> {
        self.best_path
    }

    pub fn best_path(&self) -> Option<&ParticlePath> {
        self.paths.get(&self.best_path?)
    }

    pub fn current_robot_pose(&self) -> Pose3D {
        self.current_robot_pose
    }

    pub fn current_robot_path_score(&self) -> f32 {
        self.current_robot_path_score
    }

    pub fn tree_bounds(&self) -> Option<TreeBounds> {
        self.tree_bounds
    }

    pub fn time_step(&self) -> u32 {
        self.time_step
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    /// Velocities used by the last prediction: (mm/s, rad/s).
    pub fn last_velocities(&self) -> (f32, f32) {
        (self.forward_velocity, self.angular_velocity_pan)
    }

    /// Mean of the current poses; pan uses the circular mean.
    pub fn average_pose(&self) -> Option<Pose3D> {
        let current: Vec<Pose3D> = self
            .poses
            .iter()
            .filter_map(|id| self.paths.get(id))
            .map(|p| p.current_pose().pose)
            .collect();
        if current.is_empty() {
            return None;
        }

        let n = current.len() as f32;
        let mean = |f: fn(&Pose3D) -> f32| current.iter().map(f).sum::<f32>() / n;
        let pan = circular_mean(current.iter().map(|p| p.pan)).unwrap_or(0.0);

        Some(Pose3D::new(
            mean(|p| p.x),
            mean(|p| p.y),
            mean(|p| p.z),
            pan,
            mean(|p| p.tilt),
            mean(|p| p.roll),
        ))
    }

    /// Trajectory of the best path back through its ancestry, oldest first.
    pub fn best_trajectory(&self) -> Vec<Pose3D> {
        let mut segments: Vec<&[_]> = Vec::new();
        let mut cursor = self.best_path.map(|id| (id, usize::MAX));

        while let Some((id, upto)) = cursor {
            let Some(path) = self.paths.get(&id) else {
                break;
            };
            let end = upto.saturating_add(1).min(path.len());
            // a branched path starts with a copy of its parent's pose
            let start = usize::from(path.branch_pose().is_some()).min(end);
            segments.push(&path.poses()[start..end]);
            cursor = path.branch_pose().map(|b| (b.path, b.index));
        }

        self.settled_trajectory
            .iter()
            .copied()
            .chain(segments.iter().rev().flat_map(|s| s.iter().map(|p| p.pose)))
            .collect()
    }
}

/// Approximately normal noise with spread `b`.
///
/// Sum of 12 uniform variates in `[-1, 1)`, scaled by `b / 2`.
fn sample_normal_distribution(rng: &mut StdRng, b: f32) -> f32 {
    if b == 0.0 {
        return 0.0;
    }
    let sum: f32 = (0..12).map(|_| rng.random_range(-1.0f32..1.0)).sum();
    sum * b / 2.0
}

/// Sample a new pose from the velocity motion model.
fn sample_motion_model_velocity(
    rng: &mut StdRng,
    noise: &[f32; 6],
    pose: &Pose3D,
    forward: f32,
    angular: f32,
    dt: f32,
    scan_match_pan: Option<f32>,
) -> Pose3D {
    let (fwd_abs, ang_abs) = (forward.abs(), angular.abs());

    let v = forward + sample_normal_distribution(rng, noise[0] * fwd_abs + noise[1] * ang_abs);
    let w = angular + sample_normal_distribution(rng, noise[2] * fwd_abs + noise[3] * ang_abs);
    let gamma = sample_normal_distribution(rng, noise[4] * fwd_abs + noise[5] * ang_abs);

    let pan = scan_match_pan.unwrap_or(pose.pan);
    let (x, y) = if w.abs() > STRAIGHT_THRESHOLD {
        let radius = v / w;
        let end_pan = pan + w * dt;
        (
            pose.x + radius * (pan.cos() - end_pan.cos()),
            pose.y + radius * (end_pan.sin() - pan.sin()),
        )
    } else {
        (pose.x + v * dt * pan.sin(), pose.y + v * dt * pan.cos())
    };

    Pose3D::new(
        x,
        y,
        pose.z,
        wrap_angle(pan + w * dt + gamma * dt),
        pose.tilt,
        pose.roll,
    )
}
