/// Cleanup configuration loading (JSON file + environment overrides)
use crate::config::types::{CleanupError, RemovalPolicy, RemovalStrategy, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Verbosity level at which deletion diagnostics are emitted
pub const DEFAULT_VERBOSE_LEVEL: u8 = 3;

pub const ENV_VERBOSE_LEVEL: &str = "SCRATCHGUARD_VERBOSE_LEVEL";
pub const ENV_STRATEGY: &str = "SCRATCHGUARD_STRATEGY";
pub const ENV_ONE_FILESYSTEM: &str = "SCRATCHGUARD_ONE_FILESYSTEM";

/// Settings consulted by a `Deleter` when its cleanup action runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Level passed to the reporter for "Deleting ..." messages
    pub verbose_level: u8,
    /// Tree removal strategy
    pub strategy: RemovalStrategy,
    /// Do not descend into directories mounted from another device
    pub one_filesystem: bool,
    /// Print failure messages to stderr in addition to the log
    pub echo_errors: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            verbose_level: DEFAULT_VERBOSE_LEVEL,
            strategy: RemovalStrategy::Secure,
            one_filesystem: true,
            echo_errors: true,
        }
    }
}

impl CleanupConfig {
    /// Load configuration from a JSON file; missing keys keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CleanupError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| CleanupError::Config(format!("Failed to parse config JSON: {}", e)))
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `SCRATCHGUARD_*` overrides on top of this configuration
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_VERBOSE_LEVEL) {
            self.verbose_level = level.trim().parse().map_err(|_| {
                CleanupError::Config(format!(
                    "{} must be an integer between 0 and 255, got '{}'",
                    ENV_VERBOSE_LEVEL, level
                ))
            })?;
        }

        if let Some(strategy) = lookup(ENV_STRATEGY) {
            self.strategy = strategy.parse()?;
        }

        if let Some(flag) = lookup(ENV_ONE_FILESYSTEM) {
            self.one_filesystem = parse_flag(ENV_ONE_FILESYSTEM, &flag)?;
        }

        Ok(self)
    }

    /// Removal policy derived from this configuration
    pub fn removal_policy(&self) -> RemovalPolicy {
        RemovalPolicy {
            strategy: self.strategy,
            one_filesystem: self.one_filesystem,
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CleanupError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}
