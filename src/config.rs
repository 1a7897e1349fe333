//! Configuration model for the lock manager.
//!
//! This module defines the ManagerConfig struct that embedders load from a
//! `lockmanager.yaml` (or build in code via `Default`). It supports
//! forward-compatible YAML parsing (unknown fields are ignored), sensible
//! defaults for optional fields, and validation of config values.

use crate::error::{LockError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the workspace lock manager.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Seconds a blocked acquisition may wait before a warning is logged.
    #[serde(default = "default_long_wait_warning_secs")]
    pub long_wait_warning_secs: u64,

    /// Minutes after which a held rule is reported as stale in diagnostics.
    #[serde(default = "default_stale_hold_minutes")]
    pub stale_hold_minutes: u32,

    /// Milliseconds between cancellation re-checks while blocked waiting
    /// for a conflicting holder. Bounds interruption latency.
    #[serde(default = "default_wait_recheck_millis")]
    pub wait_recheck_millis: u64,
}

// Default value functions for serde
fn default_long_wait_warning_secs() -> u64 {
    30
}
fn default_stale_hold_minutes() -> u32 {
    120
}
fn default_wait_recheck_millis() -> u64 {
    250
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            long_wait_warning_secs: default_long_wait_warning_secs(),
            stale_hold_minutes: default_stale_hold_minutes(),
            wait_recheck_millis: default_wait_recheck_millis(),
        }
    }
}

impl ManagerConfig {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(ManagerConfig)` - Successfully loaded and validated config
    /// * `Err(LockError::InvalidConfig)` - Read, parse, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockError::InvalidConfig(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ManagerConfig = serde_yaml::from_str(yaml)
            .map_err(|e| LockError::InvalidConfig(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| LockError::InvalidConfig(format!("failed to serialize config: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `long_wait_warning_secs` must be positive
    /// - `stale_hold_minutes` must be positive
    /// - `wait_recheck_millis` must be positive
    pub fn validate(&self) -> Result<()> {
        if self.long_wait_warning_secs == 0 {
            return Err(LockError::InvalidConfig(
                "long_wait_warning_secs must be greater than 0".to_string(),
            ));
        }

        if self.stale_hold_minutes == 0 {
            return Err(LockError::InvalidConfig(
                "stale_hold_minutes must be greater than 0".to_string(),
            ));
        }

        if self.wait_recheck_millis == 0 {
            return Err(LockError::InvalidConfig(
                "wait_recheck_millis must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
