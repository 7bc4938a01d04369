//! Top-level configuration loaded from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::algorithms::localization::{MotionModelConfig, RobotGeometry};
use crate::algorithms::mapping::OccupancyGridConfig;
use crate::core::error::Result;

/// Ray model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayModelSection {
    /// XML lookup table to load instead of the built-in Surveyor SVS table.
    pub file: Option<String>,

    /// Write tables in the compact integer form.
    pub integer_mode: bool,

    /// Score observations without adding them to the map.
    pub localise_only: bool,
}

impl Default for RayModelSection {
    fn default() -> Self {
        Self {
            file: None,
            integer_mode: true,
            localise_only: false,
        }
    }
}

/// Full drishti-slam configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlamConfig {
    /// RNG seed (0 = seed from the OS).
    pub seed: u64,

    /// Path tree settings
    pub motion: MotionModelConfig,

    /// Grid settings
    pub grid: OccupancyGridConfig,

    /// Drive and camera geometry
    pub robot: RobotGeometry,

    /// Sensor model settings
    pub ray_model: RayModelSection,
}

impl Default for SlamConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            motion: MotionModelConfig::default(),
            grid: OccupancyGridConfig::default(),
            robot: RobotGeometry::default(),
            ray_model: RayModelSection::default(),
        }
    }
}

impl SlamConfig {
    /// Load and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&contents)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Self = basic_toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.motion.validate()?;
        self.grid.validate()?;
        self.robot.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SlamError;

    #[test]
    fn test_default_config() {
        let config = SlamConfig::default();
        config.validate().unwrap();
        assert_eq!(config.motion.survey_trial_poses, 200);
        assert_eq!(config.grid.cell_size_mm, 40.0);
        assert!(config.ray_model.file.is_none());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = SlamConfig::from_toml(include_str!("../../drishti-slam.toml")).unwrap();
        assert_eq!(config, SlamConfig::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SlamConfig::from_toml(
            r#"
            seed = 7

            [motion]
            survey_trial_poses = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.motion.survey_trial_poses, 50);
        assert_eq!(config.motion.cull_threshold, 75);
        assert_eq!(config.grid, OccupancyGridConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = SlamConfig::from_toml("[motion]\ncull_threshold = 0\n").unwrap_err();
        assert!(matches!(err, SlamError::InvalidConfig(_)));

        let err = SlamConfig::from_toml("[grid]\ncell_size_mm = -1.0\n").unwrap_err();
        assert!(matches!(err, SlamError::InvalidConfig(_)));

        let err = SlamConfig::from_toml("seed = \"abc\"").unwrap_err();
        assert!(matches!(err, SlamError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slam.toml");
        std::fs::write(&path, "[robot]\nwheel_base_mm = 230.0\n").unwrap();

        let config = SlamConfig::load(&path).unwrap();
        assert_eq!(config.robot.wheel_base_mm, 230.0);

        assert!(matches!(
            SlamConfig::load(dir.path().join("missing.toml")),
            Err(SlamError::Io(_))
        ));
    }
}
