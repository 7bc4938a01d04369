//! A hypothesised trajectory: one branch of the particle tree.

use crate::algorithms::mapping::OccupancyGrid;
use crate::core::types::{PathId, PoseRef, Pose3D};

use super::particle_pose::ParticlePose;

/// Ordered chain of pose hypotheses with its accumulated score.
///
/// A path either starts at a reset (a root) or forks from the current pose
/// of a mature parent. Its poses are never empty.
#[derive(Debug, Clone)]
pub struct ParticlePath {
    id: PathId,
    poses: Vec<ParticlePose>,
    total_score: f32,
    local_score: f32,
    enabled: bool,
    collapsed: bool,
    branch_pose: Option<PoseRef>,
    total_children: u32,
    created_at: u32,
}

impl ParticlePath {
    /// New root path starting at `pose`.
    pub fn new(id: PathId, pose: Pose3D, time_step: u32) -> Self {
        Self {
            id,
            poses: vec![ParticlePose::new(pose, time_step, id, None)],
            total_score: 0.0,
            local_score: 0.0,
            enabled: true,
            collapsed: false,
            branch_pose: None,
            total_children: 0,
            created_at: time_step,
        }
    }

    /// Fork a child path from the current pose.
    ///
    /// The child starts with a copy of that pose and inherits the scores
    /// accumulated so far. `self` stops being extended: it is disabled and
    /// its child count goes up.
    pub fn fork(&mut self, child_id: PathId, time_step: u32) -> ParticlePath {
        let branch = PoseRef::new(self.id, self.poses.len() - 1);
        let current = self.current_pose();

        let child = Self {
            id: child_id,
            poses: vec![ParticlePose::new(
                current.pose,
                current.time_step,
                child_id,
                Some(branch),
            )],
            total_score: self.total_score,
            local_score: self.local_score,
            enabled: true,
            collapsed: false,
            branch_pose: Some(branch),
            total_children: 0,
            created_at: time_step,
        };

        self.enabled = false;
        self.total_children += 1;
        child
    }

    /// Append a newly predicted pose.
    pub fn add(&mut self, pose: Pose3D, time_step: u32) {
        let parent = PoseRef::new(self.id, self.poses.len() - 1);
        self.poses
            .push(ParticlePose::new(pose, time_step, self.id, Some(parent)));
    }

    /// Accumulate an observation score.
    pub fn add_score(&mut self, score: f32) {
        self.total_score += score;
        self.local_score += score;
    }

    /// Retract every hypothesis this path wrote into the grid.
    pub fn remove(&mut self, grid: &mut OccupancyGrid) -> usize {
        let cells = self.take_observed_cells();
        grid.remove_hypotheses(self.id, &cells)
    }

    /// Make this path's hypotheses permanent and mark it collapsed.
    pub fn distill(&mut self, grid: &mut OccupancyGrid) -> usize {
        let cells = self.take_observed_cells();
        self.collapsed = true;
        self.enabled = false;
        grid.distill_hypotheses(self.id, &cells)
    }

    fn take_observed_cells(&mut self) -> Vec<usize> {
        let mut cells: Vec<usize> = self
            .poses
            .iter_mut()
            .flat_map(|p| std::mem::take(&mut p.observed_cells))
            .collect();
        cells.sort_unstable();
        cells.dedup();
        cells
    }

    /// Forget the link to a parent that no longer exists.
    pub(crate) fn sever_branch(&mut self) {
        self.branch_pose = None;
        self.poses[0].parent = None;
    }

    pub(crate) fn child_removed(&mut self) {
        self.total_children = self.total_children.saturating_sub(1);
    }

    pub fn id(&self) -> PathId {
        self.id
    }

    pub fn poses(&self) -> &[ParticlePose] {
        &self.poses
    }

    pub fn current_pose(&self) -> &ParticlePose {
        &self.poses[self.poses.len() - 1]
    }

    pub fn current_pose_mut(&mut self) -> &mut ParticlePose {
        let last = self.poses.len() - 1;
        &mut self.poses[last]
    }

    /// Number of poses in this path alone.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Always false: a path holds at least one pose.
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn is_mature(&self, pose_maturation: usize) -> bool {
        self.poses.len() >= pose_maturation
    }

    pub fn total_score(&self) -> f32 {
        self.total_score
    }

    pub fn local_score(&self) -> f32 {
        self.local_score
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn branch_pose(&self) -> Option<PoseRef> {
        self.branch_pose
    }

    pub fn total_children(&self) -> u32 {
        self.total_children
    }

    pub fn created_at(&self) -> u32 {
        self.created_at
    }

    #[cfg(test)]
    pub(crate) fn set_total_score(&mut self, score: f32) {
        self.total_score = score;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::mapping::OccupancyGridConfig;
    use crate::core::types::Point3D;
    use crate::sensors::EvidenceRay;
    use approx::assert_relative_eq;

    #[test]
    fn test_fork_copies_current_pose_and_scores() {
        let mut parent = ParticlePath::new(PathId(1), Pose3D::default(), 0);
        parent.add(Pose3D::planar(0.0, 100.0, 0.0), 1);
        parent.add_score(2.5);

        let child = parent.fork(PathId(2), 1);

        assert!(!parent.enabled());
        assert_eq!(parent.total_children(), 1);

        assert!(child.enabled());
        assert_eq!(child.len(), 1);
        assert_eq!(child.current_pose().pose, Pose3D::planar(0.0, 100.0, 0.0));
        assert_eq!(child.current_pose().path, PathId(2));
        assert_eq!(child.branch_pose(), Some(PoseRef::new(PathId(1), 1)));
        assert_eq!(child.current_pose().parent, Some(PoseRef::new(PathId(1), 1)));
        assert_relative_eq!(child.total_score(), 2.5);
        assert_relative_eq!(child.local_score(), 2.5);
    }

    #[test]
    fn test_scores_accumulate() {
        let mut path = ParticlePath::new(PathId(1), Pose3D::default(), 0);
        for s in [1.0, -0.5, 2.0] {
            path.add_score(s);
        }
        assert_relative_eq!(path.total_score(), 2.5);
        assert_relative_eq!(path.local_score(), 2.5);
    }

    #[test]
    fn test_remove_retracts_grid_hypotheses() {
        let mut grid = OccupancyGrid::new(OccupancyGridConfig::default());
        let ray = EvidenceRay::new(
            0,
            Point3D::new(0.0, 100.0, 100.0),
            Point3D::new(0.0, 500.0, 100.0),
            0.5,
            40.0,
            10.0,
        );

        let mut path = ParticlePath::new(PathId(1), Pose3D::default(), 0);
        path.add(Pose3D::default(), 1);
        path.current_pose_mut()
            .add_observation(&[vec![ray.clone()]], &mut grid, &[PathId(1)], false);
        path.add(Pose3D::default(), 2);
        path.current_pose_mut()
            .add_observation(&[vec![ray]], &mut grid, &[PathId(1)], false);

        let written = grid.hypothesis_count();
        assert!(written > 0);
        assert_eq!(path.remove(&mut grid), written);
        assert_eq!(grid.hypothesis_count(), 0);
    }

    #[test]
    fn test_maturity() {
        let mut path = ParticlePath::new(PathId(1), Pose3D::default(), 0);
        assert!(path.is_mature(0));
        assert!(path.is_mature(1));
        assert!(!path.is_mature(2));
        path.add(Pose3D::default(), 1);
        assert!(path.is_mature(2));
    }
}
