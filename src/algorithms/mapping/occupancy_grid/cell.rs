//! Grid cell contents.

use crate::core::types::PathId;

/// Occupancy evidence left in a cell by one path at one time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHypothesis {
    pub path: PathId,
    pub time_step: u32,
    pub log_odds: f32,
}

/// One allocated grid cell.
///
/// `distilled` holds evidence from paths that every surviving hypothesis
/// descends from, so it is visible to everyone. `hypotheses` is only visible
/// to the paths that made them and their descendants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridCell {
    pub distilled: Option<f32>,
    pub hypotheses: Vec<GridHypothesis>,
}

impl GridCell {
    /// Log-odds seen by a path with the given ancestry, if anything is visible.
    ///
    /// Hypotheses made by `exclude_path` at `exclude_step` are skipped, so a
    /// pose never scores against what it wrote during the same observation.
    pub fn visible_log_odds(
        &self,
        ancestry: &[PathId],
        exclude: Option<(PathId, u32)>,
    ) -> Option<f32> {
        let mut total = self.distilled;
        for h in &self.hypotheses {
            if exclude == Some((h.path, h.time_step)) || !ancestry.contains(&h.path) {
                continue;
            }
            *total.get_or_insert(0.0) += h.log_odds;
        }
        total
    }

    /// Nothing stored: the cell can be released.
    pub fn is_empty(&self) -> bool {
        self.distilled.is_none() && self.hypotheses.is_empty()
    }

    /// Drop the hypotheses of a path. Returns how many were removed.
    pub fn remove_path(&mut self, path: PathId) -> usize {
        let before = self.hypotheses.len();
        self.hypotheses.retain(|h| h.path != path);
        before - self.hypotheses.len()
    }

    /// Fold the hypotheses of a path into the distilled value.
    pub fn distill_path(&mut self, path: PathId, log_odds_max: f32) -> usize {
        let mut folded = 0;
        let mut sum = 0.0;
        self.hypotheses.retain(|h| {
            if h.path == path {
                sum += h.log_odds;
                folded += 1;
                false
            } else {
                true
            }
        });
        if folded > 0 {
            let value = self.distilled.unwrap_or(0.0) + sum;
            self.distilled = Some(value.clamp(-log_odds_max, log_odds_max));
        }
        folded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hyp(path: u64, time_step: u32, log_odds: f32) -> GridHypothesis {
        GridHypothesis {
            path: PathId(path),
            time_step,
            log_odds,
        }
    }

    #[test]
    fn test_visibility_follows_ancestry() {
        let cell = GridCell {
            distilled: None,
            hypotheses: vec![hyp(1, 1, 2.0), hyp(2, 1, -1.0), hyp(3, 2, 0.5)],
        };

        assert_eq!(cell.visible_log_odds(&[PathId(9)], None), None);
        assert_relative_eq!(cell.visible_log_odds(&[PathId(1)], None).unwrap(), 2.0);
        assert_relative_eq!(
            cell.visible_log_odds(&[PathId(3), PathId(1)], None).unwrap(),
            2.5
        );
        assert_eq!(
            cell.visible_log_odds(&[PathId(3)], Some((PathId(3), 2))),
            None
        );
    }

    #[test]
    fn test_distill_folds_and_clamps() {
        let mut cell = GridCell {
            distilled: Some(1.0),
            hypotheses: vec![hyp(1, 1, 2.0), hyp(1, 2, 3.0), hyp(2, 1, -1.0)],
        };

        assert_eq!(cell.distill_path(PathId(1), 4.0), 2);
        assert_relative_eq!(cell.distilled.unwrap(), 4.0);
        assert_eq!(cell.hypotheses.len(), 1);

        // distilled evidence is visible to unrelated paths
        assert_relative_eq!(cell.visible_log_odds(&[PathId(7)], None).unwrap(), 4.0);
    }

    #[test]
    fn test_remove_path() {
        let mut cell = GridCell {
            distilled: None,
            hypotheses: vec![hyp(1, 1, 2.0), hyp(2, 1, -1.0)],
        };
        assert_eq!(cell.remove_path(PathId(2)), 1);
        assert!(!cell.is_empty());
        assert_eq!(cell.remove_path(PathId(1)), 1);
        assert!(cell.is_empty());
    }
}
