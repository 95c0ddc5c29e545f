//! Configuration for process listing and path queries

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PsError, PsResult};
use crate::kernel::{PathFormat, DEFAULT_PATH_CAPACITY, MAX_PATH_CAPACITY, PROCESS_ALL_ACCESS};

const APP_NAME: &str = "winps";

/// Scan configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Output buffer size for path queries (bytes)
    pub path_capacity: usize,

    /// Drive-letter or device path form
    pub path_format: PathFormat,

    /// Access mask requested when opening a process
    pub access_rights: u32,

    /// Let child processes inherit opened process handles
    pub inherit_handles: bool,

    /// Preallocated slots for a listing
    pub initial_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            path_capacity: DEFAULT_PATH_CAPACITY,
            path_format: PathFormat::Win32,
            access_rights: PROCESS_ALL_ACCESS,
            inherit_handles: false,
            initial_capacity: 50,
        }
    }
}

impl ScanConfig {
    /// Load config from TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `<config dir>/winps/config.toml`, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    pub fn validate(&self) -> PsResult<()> {
        if self.path_capacity == 0 {
            return Err(PsError::InvalidConfig("path_capacity must be positive".into()));
        }
        if self.path_capacity > MAX_PATH_CAPACITY {
            return Err(PsError::InvalidConfig(format!(
                "path_capacity {} exceeds {}",
                self.path_capacity, MAX_PATH_CAPACITY
            )));
        }
        if self.access_rights == 0 {
            return Err(PsError::InvalidConfig(
                "access_rights must request at least one right".into(),
            ));
        }
        Ok(())
    }
}
