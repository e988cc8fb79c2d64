//! Run configuration and saved run profiles
//!
//! `RunConfig` is what the operator chose for one run. The sequencer treats
//! its string fields as opaque; [`RunConfig::validate`] is called by the
//! configuration source before a run is started.

mod store;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

pub use store::{ProfileEnvelope, ProfileStore, PROFILE_VERSION};

/// Parameters captured at run start, immutable for the run's duration
///
/// Serialized field names follow the dashboard's saved-config file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    #[serde(rename = "suite")]
    pub suite_id: String,
    #[serde(rename = "device_ip")]
    pub device_address: String,
    pub port: String,
    #[serde(rename = "timeout")]
    pub timeout_seconds: String,
    pub verbose: bool,
    #[serde(rename = "stop_on_fail")]
    pub stop_on_first_failure: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        crate::common::config::Defaults::default().to_run_config()
    }
}

impl RunConfig {
    /// Check the connection parameters before handing the config to the sequencer
    pub fn validate(&self) -> Result<()> {
        if self.device_address.trim().is_empty() {
            return Err(Error::invalid_run_config(
                "device_address",
                "must not be empty",
            ));
        }

        match self.port.trim().parse::<u16>() {
            Ok(port) if port > 0 => {}
            _ => {
                return Err(Error::invalid_run_config(
                    "port",
                    format!("'{}' is not a port number between 1 and 65535", self.port),
                ))
            }
        }

        match self.timeout_seconds.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => {}
            _ => {
                return Err(Error::invalid_run_config(
                    "timeout_seconds",
                    format!("'{}' is not a positive number of seconds", self.timeout_seconds),
                ))
            }
        }

        Ok(())
    }
}
