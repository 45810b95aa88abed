//! Configuration of the `rx_replay` tool: a recorded session plus device,
//! engine parameters and output options.

use crate::config::EngineParams;
use crate::controller::DeviceCapabilities;
use crate::types::PatientProfile;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Both,
}

impl OutputFormat {
    pub fn includes_text(self) -> bool {
        matches!(self, OutputFormat::Text | OutputFormat::Both)
    }

    pub fn includes_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Report destination; printed to stdout when absent.
    pub json_out: Option<PathBuf>,
    /// Where to persist the aggregate record.
    pub record_out: Option<PathBuf>,
}

/// One recorded controller input.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReplayStep {
    Sample { angle: f32, power: f32 },
    WorkingMeridian { working_meridian: f32 },
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub device: DeviceCapabilities,
    #[serde(default)]
    pub params: EngineParams,
    #[serde(default)]
    pub patient: Option<PatientProfile>,
    pub steps: Vec<ReplayStep>,
    /// Run the pipeline at the end even if the session did not complete.
    #[serde(default = "default_true")]
    pub finalize: bool,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_true() -> bool {
    true
}

pub fn load_config(path: &Path) -> Result<ReplayConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: ReplayConfig = serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    config
        .device
        .validate()
        .and_then(|_| config.params.validate())
        .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
    Ok(config)
}
