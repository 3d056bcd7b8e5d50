//! Rule files.
//!
//! ```toml
//! [[mode]]
//! port = 0
//! mode = "enable_96"
//!
//! [[rule]]
//! primary = 10
//! secondary = 11
//! # pattern, mask, key and action tables follow
//!
//! [[egress]]
//! port = 2
//! index = 5
//! data = { eg_vid_mode_override = true, eg_vid_data = 100 }
//! ```

use anyhow::{Context, Result};
use msd_tcam::{AdvancedRule, TcamEgressData, TcamMode};
use msd_types::LogicalPort;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModeSetting {
    pub port: LogicalPort,
    pub mode: TcamMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EgressSetting {
    pub port: LogicalPort,
    pub index: u8,
    #[serde(default)]
    pub data: TcamEgressData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuleFile {
    #[serde(default, rename = "mode")]
    pub modes: Vec<ModeSetting>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<AdvancedRule>,
    #[serde(default, rename = "egress")]
    pub egress: Vec<EgressSetting>,
}

impl RuleFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read rule file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
