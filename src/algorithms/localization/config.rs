//! Motion model and robot geometry configuration.
//!
//! The motion model settings can also be exchanged as XML:
//!
//! ```xml
//! <MotionModel>
//!   <NoOfPoses>200</NoOfPoses>
//!   <CullThreshold>75</CullThreshold>
//!   <MaturationTimeSteps>10</MaturationTimeSteps>
//!   <MotionNoise>0.08,0.1,0.0005,0.1,0.0002,0.05</MotionNoise>
//! </MotionModel>
//! ```

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SlamError};

/// Configuration for the path tree motion model.
///
/// The noise coefficients scale the spread of the sampled velocities:
/// - `motion_noise[0]`, `[1]`: forward velocity noise from forward / angular speed
/// - `motion_noise[2]`, `[3]`: angular velocity noise from forward / angular speed
/// - `motion_noise[4]`, `[5]`: residual rotation from forward / angular speed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionModelConfig {
    /// Maximum number of live paths after each prune.
    pub survey_trial_poses: usize,

    /// Percentage of the sorted population culled each prune (1..=100).
    pub cull_threshold: u32,

    /// Poses a path must hold before it can be culled or fork children.
    pub pose_maturation: usize,

    /// Noise coefficients, see the type docs.
    pub motion_noise: [f32; 6],
}

impl Default for MotionModelConfig {
    fn default() -> Self {
        Self {
            survey_trial_poses: 200,
            cull_threshold: 75,
            pose_maturation: 10,
            motion_noise: [0.08, 0.1, 0.0005, 0.1, 0.0002, 0.05],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "MotionModel")]
struct MotionModelXml {
    #[serde(rename = "NoOfPoses")]
    no_of_poses: usize,
    #[serde(rename = "CullThreshold")]
    cull_threshold: u32,
    #[serde(rename = "MaturationTimeSteps")]
    maturation_time_steps: usize,
    #[serde(rename = "MotionNoise")]
    motion_noise: String,
}

impl MotionModelConfig {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        if self.survey_trial_poses == 0 {
            return Err(SlamError::InvalidConfig(
                "survey_trial_poses must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&self.cull_threshold) {
            return Err(SlamError::InvalidConfig(format!(
                "cull_threshold must be in 1..=100, got {}",
                self.cull_threshold
            )));
        }
        if let Some(bad) = self
            .motion_noise
            .iter()
            .find(|n| !n.is_finite() || **n < 0.0)
        {
            return Err(SlamError::InvalidConfig(format!(
                "motion noise coefficient out of range: {}",
                bad
            )));
        }
        Ok(())
    }

    /// Serialise to the `MotionModel` XML element.
    pub fn to_xml(&self) -> Result<String> {
        let doc = MotionModelXml {
            no_of_poses: self.survey_trial_poses,
            cull_threshold: self.cull_threshold,
            maturation_time_steps: self.pose_maturation,
            motion_noise: self
                .motion_noise
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        };

        let mut xml = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut xml);
        serializer.indent(' ', 2);
        doc.serialize(serializer)
            .map_err(|e| SlamError::Xml(e.to_string()))?;
        Ok(xml)
    }

    /// Parse the `MotionModel` XML element.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc: MotionModelXml = quick_xml::de::from_str(xml)?;

        let values = doc
            .motion_noise
            .split(',')
            .map(|s| {
                s.trim()
                    .parse::<f32>()
                    .map_err(|e| SlamError::Parse(format!("MotionNoise '{}': {}", s, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        let motion_noise: [f32; 6] = values.try_into().map_err(|v: Vec<f32>| {
            SlamError::Parse(format!("MotionNoise needs 6 values, got {}", v.len()))
        })?;

        let config = Self {
            survey_trial_poses: doc.no_of_poses,
            cull_threshold: doc.cull_threshold,
            pose_maturation: doc.maturation_time_steps,
            motion_noise,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Differential drive geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotGeometry {
    /// Drive wheel diameter in millimetres.
    pub wheel_diameter_mm: f32,

    /// Distance between wheel centres in millimetres.
    pub wheel_base_mm: f32,

    /// Encoder ticks per wheel revolution.
    pub counts_per_revolution: u32,

    /// Height of the stereo cameras above the floor in millimetres.
    pub camera_height_mm: f32,
}

impl Default for RobotGeometry {
    fn default() -> Self {
        Self {
            wheel_diameter_mm: 70.0,
            wheel_base_mm: 170.0,
            counts_per_revolution: 220,
            camera_height_mm: 300.0,
        }
    }
}

impl RobotGeometry {
    pub fn wheel_radius_mm(&self) -> f32 {
        self.wheel_diameter_mm / 2.0
    }

    /// Wheel travel per encoder tick, in millimetres.
    pub fn mm_per_tick(&self) -> f32 {
        std::f32::consts::PI * self.wheel_diameter_mm / self.counts_per_revolution as f32
    }

    /// Check that every dimension is positive.
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.wheel_diameter_mm) || !positive(self.wheel_base_mm) {
            return Err(SlamError::InvalidConfig(
                "wheel diameter and wheel base must be positive".to_string(),
            ));
        }
        if !(self.camera_height_mm.is_finite() && self.camera_height_mm >= 0.0) {
            return Err(SlamError::InvalidConfig(
                "camera height must not be negative".to_string(),
            ));
        }
        if self.counts_per_revolution == 0 {
            return Err(SlamError::InvalidConfig(
                "counts_per_revolution must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
