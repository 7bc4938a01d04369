//! A single pose hypothesis within a particle path.

use crate::algorithms::mapping::OccupancyGrid;
use crate::core::types::{PathId, PoseRef, Pose3D};
use crate::sensors::EvidenceRay;

/// Pose hypothesis at one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticlePose {
    /// Hypothesised robot pose.
    pub pose: Pose3D,
    /// Time step at which the pose was predicted.
    pub time_step: u32,
    /// Path that owns this pose.
    pub path: PathId,
    /// Previous pose on the trajectory, possibly in an ancestor path.
    pub parent: Option<PoseRef>,
    /// Grid cells this pose wrote hypotheses into.
    pub observed_cells: Vec<usize>,
    /// Matching score of the last observation, `None` until scored or when
    /// no ray met any evidence.
    pub score: Option<f32>,
}

impl ParticlePose {
    pub fn new(pose: Pose3D, time_step: u32, path: PathId, parent: Option<PoseRef>) -> Self {
        Self {
            pose,
            time_step,
            path,
            parent,
            observed_cells: Vec::new(),
            score: None,
        }
    }

    /// Score a set of robot-local rays as if observed from this pose.
    ///
    /// `rays` holds one list per camera. Each ray is projected into the pose,
    /// matched against the grid through `ancestry`, and, unless
    /// `localise_only`, written back as hypotheses of this pose's path.
    pub fn add_observation(
        &mut self,
        rays: &[Vec<EvidenceRay>],
        grid: &mut OccupancyGrid,
        ancestry: &[PathId],
        localise_only: bool,
    ) -> Option<f32> {
        let mut score: Option<f32> = None;

        for ray in rays.iter().flatten() {
            let trial = ray.observed_from_pose(&self.pose);
            if let Some(s) = grid.insert(
                &trial,
                self.path,
                ancestry,
                self.time_step,
                localise_only,
                &mut self.observed_cells,
            ) {
                *score.get_or_insert(0.0) += s;
            }
        }

        self.score = score;
        score
    }
}
