//! Point and pose types for 3D stereo SLAM.
//!
//! Units are millimetres and radians. The robot looks along +Y when its pan
//! is zero, and positive pan turns clockwise towards +X.

use serde::{Deserialize, Serialize};

/// A 3D point in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    /// Create a new point.
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Rotate about the origin: roll, then tilt, then pan.
    ///
    /// ```text
    /// roll: XZ plane, angle measured from +Z towards +X
    /// tilt: YZ plane, angle measured from +Y towards +Z
    /// pan:  XY plane, angle measured from +Y towards +X
    /// ```
    #[inline]
    pub fn rotate(&self, pan: f32, tilt: f32, roll: f32) -> Point3D {
        let (mut x, mut y, mut z) = (self.x, self.y, self.z);

        if roll != 0.0 {
            let (s, c) = roll.sin_cos();
            let (rx, rz) = (x * c + z * s, -x * s + z * c);
            x = rx;
            z = rz;
        }

        if tilt != 0.0 {
            let (s, c) = tilt.sin_cos();
            let (ty, tz) = (y * c - z * s, y * s + z * c);
            y = ty;
            z = tz;
        }

        if pan != 0.0 {
            let (s, c) = pan.sin_cos();
            let (px, py) = (x * c + y * s, -x * s + y * c);
            x = px;
            y = py;
        }

        Point3D::new(x, y, z)
    }

    /// Translate by the given offsets.
    #[inline]
    pub fn translate(&self, dx: f32, dy: f32, dz: f32) -> Point3D {
        Point3D::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Distance to another point, ignoring height.
    #[inline]
    pub fn distance_xy(&self, other: &Point3D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Full 3D distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point3D) -> f32 {
        let dz = self.z - other.z;
        let dxy = self.distance_xy(other);
        (dxy * dxy + dz * dz).sqrt()
    }
}

/// Robot or camera pose in 3D.
///
/// The raw constructor does not wrap angles. Code that produces poses from
/// motion (the motion model, pose averaging) wraps pan with
/// [`wrap_angle`](crate::core::math::wrap_angle).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose3D {
    /// X position in millimetres
    pub x: f32,
    /// Y position in millimetres (forward at zero pan)
    pub y: f32,
    /// Height in millimetres
    pub z: f32,
    /// Pan (yaw) in radians
    pub pan: f32,
    /// Tilt (pitch) in radians
    pub tilt: f32,
    /// Roll in radians
    pub roll: f32,
}

impl Pose3D {
    /// Create a new pose.
    #[inline]
    pub fn new(x: f32, y: f32, z: f32, pan: f32, tilt: f32, roll: f32) -> Self {
        Self {
            x,
            y,
            z,
            pan,
            tilt,
            roll,
        }
    }

    /// Pose on the floor plane with only a heading.
    #[inline]
    pub fn planar(x: f32, y: f32, pan: f32) -> Self {
        Self::new(x, y, 0.0, pan, 0.0, 0.0)
    }

    /// Position component.
    #[inline]
    pub fn position(&self) -> Point3D {
        Point3D::new(self.x, self.y, self.z)
    }

    /// Rotate the position about the origin, adding the angles to the orientation.
    pub fn rotate(&self, pan: f32, tilt: f32, roll: f32) -> Pose3D {
        let p = self.position().rotate(pan, tilt, roll);
        Pose3D::new(
            p.x,
            p.y,
            p.z,
            self.pan + pan,
            self.tilt + tilt,
            self.roll + roll,
        )
    }

    /// Translate the position, keeping the orientation.
    pub fn translate(&self, dx: f32, dy: f32, dz: f32) -> Pose3D {
        Pose3D {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
            ..*self
        }
    }

    /// Component-wise sum.
    pub fn add(&self, other: &Pose3D) -> Pose3D {
        Pose3D::new(
            self.x + other.x,
            self.y + other.y,
            self.z + other.z,
            self.pan + other.pan,
            self.tilt + other.tilt,
            self.roll + other.roll,
        )
    }

    /// Component-wise difference.
    pub fn subtract(&self, other: &Pose3D) -> Pose3D {
        Pose3D::new(
            self.x - other.x,
            self.y - other.y,
            self.z - other.z,
            self.pan - other.pan,
            self.tilt - other.tilt,
            self.roll - other.roll,
        )
    }

    /// Planar distance between two poses.
    #[inline]
    pub fn distance_xy(&self, other: &Pose3D) -> f32 {
        self.position().distance_xy(&other.position())
    }
}
