//! On-disk store for saved run profiles
//!
//! Each profile is a pretty-printed JSON file wrapping the config in a
//! metadata envelope. Loading also accepts a bare config object.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::RunConfig;
use crate::common::{paths, Error, Result};

/// Version tag written into every saved profile
pub const PROFILE_VERSION: &str = "beta-1.0";

/// Metadata envelope around a saved config
///
/// `saved_at` is kept as text so files written by older tools, whose
/// timestamps carry no offset, still load with their metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileEnvelope {
    #[serde(default)]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub config: RunConfig,
}

/// Directory of saved profiles
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Store rooted at an explicit directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store at the platform data directory
    pub fn default_location() -> Result<Self> {
        paths::profiles_dir()
            .map(Self::new)
            .ok_or_else(|| Error::Config("Could not determine a data directory".to_string()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a profile name to a path inside the store
    ///
    /// Absolute paths are used as-is; a missing extension becomes `.json`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let mut path = PathBuf::from(name);
        if path.extension().is_none() {
            path.set_extension("json");
        }
        if path.is_absolute() {
            path
        } else {
            self.dir.join(path)
        }
    }

    /// Save a config under the given name, returning the written path
    pub fn save(&self, name: &str, config: &RunConfig) -> Result<PathBuf> {
        paths::ensure_dir(&self.dir).map_err(|e| Error::file_write(&self.dir, e))?;
        let path = self.path_for(name);

        let envelope = ProfileEnvelope {
            saved_at: Some(Local::now().to_rfc3339()),
            version: Some(PROFILE_VERSION.to_string()),
            config: config.clone(),
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        envelope.serialize(&mut ser)?;

        std::fs::write(&path, buf).map_err(|e| Error::file_write(&path, e))?;
        tracing::info!(path = %path.display(), suite = %config.suite_id, "Saved run profile");
        Ok(path)
    }

    /// Load a saved profile
    pub fn load(&self, name: &str) -> Result<RunConfig> {
        self.load_envelope(name).map(|envelope| envelope.config)
    }

    /// Load a saved profile with its metadata
    ///
    /// A bare config file yields an envelope without metadata.
    pub fn load_envelope(&self, name: &str) -> Result<ProfileEnvelope> {
        let path = self.path_for(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ProfileNotFound(path.display().to_string()))
            }
            Err(e) => return Err(Error::file_read(&path, e)),
        };

        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| Error::profile_format(&path, e))?;
        if !value.is_object() {
            return Err(Error::profile_format(&path, "expected a JSON object"));
        }

        // A "config" key marks an envelope; anything else is a bare config
        let envelope = if value.get("config").is_some() {
            serde_json::from_value::<ProfileEnvelope>(value)
                .map_err(|e| Error::profile_format(&path, e))?
        } else {
            let config: RunConfig =
                serde_json::from_value(value).map_err(|e| Error::profile_format(&path, e))?;
            ProfileEnvelope {
                saved_at: None,
                version: None,
                config,
            }
        };

        tracing::debug!(path = %path.display(), "Loaded run profile");
        Ok(envelope)
    }

    /// Names of saved profiles, newest-sorting first
    ///
    /// A missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::file_read(&self.dir, e)),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        names.sort_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Delete a saved profile
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Deleted run profile");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::ProfileNotFound(path.display().to_string()))
            }
            Err(e) => Err(Error::file_write(&path, e)),
        }
    }
}
