/// Core types shared across the cleanup registry
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What a registered path turned out to be when the cleanup action looked at it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// Regular file
    File,
    /// Directory (removed recursively)
    Directory,
    /// Symbolic link whose target still exists
    Symlink,
    /// Socket, fifo, device node
    Other,
    /// Nothing there, or a dangling symlink
    Absent,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PathKind::File => "file",
            PathKind::Directory => "directory",
            PathKind::Symlink => "symlink",
            PathKind::Other => "special file",
            PathKind::Absent => "absent",
        };
        f.write_str(name)
    }
}

/// How directory trees are removed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalStrategy {
    /// openat/fstatat/unlinkat walk that never follows symlinks
    #[default]
    Secure,
    /// std::fs::remove_dir_all
    Standard,
}

impl std::str::FromStr for RemovalStrategy {
    type Err = CleanupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "secure" => Ok(RemovalStrategy::Secure),
            "standard" | "std" => Ok(RemovalStrategy::Standard),
            other => Err(CleanupError::Config(format!(
                "Unknown removal strategy '{}' (expected 'secure' or 'standard')",
                other
            ))),
        }
    }
}

/// Tree removal policy handed to the removal primitives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemovalPolicy {
    pub strategy: RemovalStrategy,
    /// Refuse to descend into directories living on another device
    pub one_filesystem: bool,
}

impl Default for RemovalPolicy {
    fn default() -> Self {
        Self {
            strategy: RemovalStrategy::Secure,
            one_filesystem: true,
        }
    }
}

/// Errors raised by the cleanup registry and its helpers
#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Exit hook error: {0}")]
    Hook(String),
}

impl From<nix::errno::Errno> for CleanupError {
    fn from(err: nix::errno::Errno) -> Self {
        CleanupError::Hook(err.to_string())
    }
}

/// Result type alias for cleanup operations
pub type Result<T> = std::result::Result<T, CleanupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("secure".parse::<RemovalStrategy>().unwrap(), RemovalStrategy::Secure);
        assert_eq!(" Standard ".parse::<RemovalStrategy>().unwrap(), RemovalStrategy::Standard);
        assert_eq!("std".parse::<RemovalStrategy>().unwrap(), RemovalStrategy::Standard);
        assert!(matches!(
            "shred".parse::<RemovalStrategy>(),
            Err(CleanupError::Config(_))
        ));
    }

    #[test]
    fn test_default_policy_is_secure_and_bounded() {
        let policy = RemovalPolicy::default();
        assert_eq!(policy.strategy, RemovalStrategy::Secure);
        assert!(policy.one_filesystem);
    }

    #[test]
    fn test_path_kind_display() {
        assert_eq!(PathKind::File.to_string(), "file");
        assert_eq!(PathKind::Other.to_string(), "special file");
    }
}
