//! Identifiers for paths in the particle tree.

use std::fmt;

/// Identifier of a particle path.
///
/// Allocated from a counter owned by the motion model. Identifiers are never
/// reused, so grid hypotheses tagged with a dead path can never be mistaken
/// for a live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathId(pub u64);

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path#{}", self.0)
    }
}

/// A pose inside a path: the path and the index of the pose within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoseRef {
    pub path: PathId,
    pub index: usize,
}

impl PoseRef {
    pub fn new(path: PathId, index: usize) -> Self {
        Self { path, index }
    }
}
