//! TCAM engine configuration.
//!
//! Loaded from a TOML file with one section per concern:
//!
//! ```toml
//! [device]
//! tcam_dev_addr = 31
//! base_reg_addr = 0
//! valid_port_vec = 4095
//!
//! [timing]
//! busy_poll_limit = 1000
//! ```
//!
//! Every field is optional and falls back to the Fir defaults.

use msd_hal::{PortMap, SwitchDevice};
use msd_types::MAX_SWITCH_PORTS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/msd/tcam.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Register addressing of the switch device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// SMI device address of the TCAM register block.
    #[serde(default = "default_tcam_dev_addr")]
    pub tcam_dev_addr: u8,

    /// SMI device address of hardware port 0.
    #[serde(default = "default_base_reg_addr")]
    pub base_reg_addr: u8,

    /// Hardware ports present on the device, bit n for hardware port n.
    #[serde(default = "default_valid_port_vec")]
    pub valid_port_vec: u32,
}

/// Busy-bit polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Operation register reads before an operation is declared stuck.
    #[serde(default = "default_busy_poll_limit")]
    pub busy_poll_limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcamConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

fn default_tcam_dev_addr() -> u8 {
    0x1F
}

fn default_base_reg_addr() -> u8 {
    0x00
}

fn default_valid_port_vec() -> u32 {
    0x0FFF
}

fn default_busy_poll_limit() -> u32 {
    1000
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            tcam_dev_addr: default_tcam_dev_addr(),
            base_reg_addr: default_base_reg_addr(),
            valid_port_vec: default_valid_port_vec(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            busy_poll_limit: default_busy_poll_limit(),
        }
    }
}

impl TcamConfig {
    /// Loads configuration from `path`, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.tcam_dev_addr > 0x1F {
            return Err(ConfigError::Invalid(
                "tcam_dev_addr must be a 5-bit SMI address".to_string(),
            ));
        }

        let ports = self.device.valid_port_vec.count_ones();
        if ports == 0 || ports > u32::from(MAX_SWITCH_PORTS) {
            return Err(ConfigError::Invalid(format!(
                "valid_port_vec must enable 1-{} ports",
                MAX_SWITCH_PORTS
            )));
        }

        if self.timing.busy_poll_limit == 0 {
            return Err(ConfigError::Invalid(
                "busy_poll_limit must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn switch_device(&self) -> SwitchDevice {
        SwitchDevice {
            tcam_dev_addr: self.device.tcam_dev_addr,
            base_reg_addr: self.device.base_reg_addr,
            port_map: PortMap::new(self.device.valid_port_vec),
        }
    }
}
