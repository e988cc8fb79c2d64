//! Settings file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};
use crate::profile::RunConfig;

/// Main settings structure
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Simulated timing of the sequencer
    #[serde(default)]
    pub timing: TimingConfig,

    /// Values used for run parameters not given on the command line
    #[serde(default)]
    pub defaults: Defaults,

    /// Test catalog source
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Simulated timing settings
///
/// Delays are in milliseconds; the cosmetic per-test duration is in seconds.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TimingConfig {
    /// Delay between "connecting" and the first test
    #[serde(default = "default_connect_delay")]
    pub connect_delay_ms: u64,

    /// Lower bound of the randomized per-test delay
    #[serde(default = "default_step_delay_min")]
    pub step_delay_min_ms: u64,

    /// Upper bound of the randomized per-test delay
    #[serde(default = "default_step_delay_max")]
    pub step_delay_max_ms: u64,

    /// Gap between one test finishing and the next starting
    #[serde(default = "default_inter_step_delay")]
    pub inter_step_delay_ms: u64,

    /// Lower bound of the displayed per-test duration
    #[serde(default = "default_display_min")]
    pub display_duration_min_secs: f64,

    /// Upper bound of the displayed per-test duration
    #[serde(default = "default_display_max")]
    pub display_duration_max_secs: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            connect_delay_ms: default_connect_delay(),
            step_delay_min_ms: default_step_delay_min(),
            step_delay_max_ms: default_step_delay_max(),
            inter_step_delay_ms: default_inter_step_delay(),
            display_duration_min_secs: default_display_min(),
            display_duration_max_secs: default_display_max(),
        }
    }
}

fn default_connect_delay() -> u64 {
    500
}
fn default_step_delay_min() -> u64 {
    300
}
fn default_step_delay_max() -> u64 {
    800
}
fn default_inter_step_delay() -> u64 {
    200
}
fn default_display_min() -> f64 {
    0.1
}
fn default_display_max() -> f64 {
    2.5
}

/// Default run parameters
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Defaults {
    #[serde(default = "default_suite")]
    pub suite: String,

    #[serde(default = "default_device_address")]
    pub device_address: String,

    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            suite: default_suite(),
            device_address: default_device_address(),
            port: default_port(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_suite() -> String {
    crate::catalog::DEFAULT_SUITE.to_string()
}
fn default_device_address() -> String {
    "192.168.1.100".to_string()
}
fn default_port() -> String {
    "8080".to_string()
}
fn default_timeout() -> String {
    "30".to_string()
}

impl Defaults {
    /// Build the baseline run configuration from these defaults
    pub fn to_run_config(&self) -> RunConfig {
        RunConfig {
            suite_id: self.suite.clone(),
            device_address: self.device_address.clone(),
            port: self.port.clone(),
            timeout_seconds: self.timeout_seconds.clone(),
            verbose: false,
            stop_on_first_failure: false,
        }
    }
}

/// Catalog source settings
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct CatalogConfig {
    /// YAML catalog to use instead of the built-in suites
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load settings from the default config file
    ///
    /// Returns default settings if the file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load settings from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}
