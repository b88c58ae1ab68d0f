//! Configuration
//!
//! Shared types, the error enum, and `CleanupConfig` loading.

pub mod settings;
pub mod types;
