//! Error type for the SLAM engine.

use thiserror::Error;

/// Errors raised by configuration loading, persistence and step sequencing.
#[derive(Error, Debug)]
pub enum SlamError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Culling left no live pose. Almost always a misconfigured cull threshold.
    #[error("Pose population collapsed ({0})")]
    PopulationCollapse(String),

    #[error("Observation token is stale (issued at step {issued}, current step {current})")]
    StaleObservation { issued: u32, current: u32 },

    #[error("Prune requires a scored observation")]
    NotEvaluated,
}

impl From<quick_xml::de::DeError> for SlamError {
    fn from(e: quick_xml::de::DeError) -> Self {
        SlamError::Xml(e.to_string())
    }
}

impl From<basic_toml::Error> for SlamError {
    fn from(e: basic_toml::Error) -> Self {
        SlamError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SlamError>;
