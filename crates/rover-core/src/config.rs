//! Optional `config.toml` settings and the `MOUNT_LOCATION` cache root.

use crate::cache::MismatchPolicy;
use crate::error::RoverError;
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the root of the cache area.
pub const MOUNT_LOCATION_VAR: &str = "MOUNT_LOCATION";

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per file (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        let base_delay = Duration::try_from_secs_f64(cfg.base_delay_secs).unwrap_or(Duration::ZERO);
        RetryPolicy {
            max_attempts: cfg.max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(cfg.max_delay_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/rover/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    /// Seconds allowed for establishing a connection.
    pub connect_timeout_secs: u64,
    /// Seconds allowed for a whole file transfer.
    pub timeout_secs: u64,
    /// What validate mode does when a cached file mismatches: "fail-fast" or "collect-all".
    pub mismatch_policy: MismatchPolicy,
    /// Optional retry policy; if missing, each file is attempted once.
    pub retry: Option<RetryConfig>,
}

impl Default for RoverConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: 3600,
            mismatch_policy: MismatchPolicy::FailFast,
            retry: None,
        }
    }
}

impl RoverConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_else(RetryPolicy::single_attempt)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::new()?;
    Ok(xdg_dirs.get_config_home().join("rover").join("config.toml"))
}

/// Load configuration from disk; a missing file, or a config directory that
/// cannot be resolved (e.g. `HOME` unset), yields the defaults.
pub fn load() -> Result<RoverConfig> {
    load_resolved(config_path())
}

fn load_resolved(path: Result<PathBuf>) -> Result<RoverConfig> {
    match path {
        Ok(path) => load_from(&path),
        Err(e) => {
            tracing::warn!("cannot locate config directory ({e:#}); using defaults");
            Ok(RoverConfig::default())
        }
    }
}

pub fn load_from(path: &Path) -> Result<RoverConfig> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(RoverConfig::default());
        }
        Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
    };
    let cfg: RoverConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

/// Root directory under which every repository directory is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountLocation(PathBuf);

impl MountLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Reads [`MOUNT_LOCATION_VAR`]. Absence is a configuration error.
    pub fn from_env() -> Result<Self, RoverError> {
        Self::from_var(std::env::var_os(MOUNT_LOCATION_VAR))
    }

    pub fn from_var(value: Option<OsString>) -> Result<Self, RoverError> {
        match value {
            Some(v) if !v.is_empty() => Ok(Self(PathBuf::from(v))),
            _ => Err(RoverError::Configuration(format!(
                "{MOUNT_LOCATION_VAR} is not set; point it at the directory that holds fetched repositories"
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// The mount path, joined onto the current directory when relative.
    pub fn absolute(&self) -> io::Result<PathBuf> {
        if self.0.is_absolute() {
            Ok(self.0.clone())
        } else {
            Ok(std::env::current_dir()?.join(&self.0))
        }
    }
}
