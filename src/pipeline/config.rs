use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convert::color::ColorRange;
use crate::delta::{DiffPolicy, DiffSampling};
use crate::frame::ChromaOrder;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Fixed per-controller policy choices.
///
/// Every field has a default, so a partial JSON document only overrides
/// what it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub chroma_order: ChromaOrder,
    pub color_range: ColorRange,
    pub diff_policy: DiffPolicy,
    pub sampling: DiffSampling,
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chroma_order: ChromaOrder::default(),
            color_range: ColorRange::default(),
            diff_policy: DiffPolicy::default(),
            sampling: DiffSampling::default(),
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file, returning the default on a missing file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("no pipeline config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}
