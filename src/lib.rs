//! scratchguard: deferred, best-effort deletion of scratch files and
//! directories when a process exits normally
//!
//! # Architecture
//!
//! ## Safety & Cleanup ([`safety`])
//! - [`safety::registry`]: the `Deleter` cleanup registry and `delete_on_exit`
//! - [`safety::removal`]: path classification and symlink-safe tree removal
//! - [`safety::outcome`]: per-path outcomes collected into a `CleanupReport`
//!
//! ## Exit Machinery ([`exit`])
//! - [`exit::hooks`]: host-owned `ExitHooks` coordinator
//! - [`exit::at_exit`]: process-wide `atexit` fallback
//! - [`exit::signals`]: shutdown-flag signal handlers
//!
//! ## Reporting ([`report`])
//! - [`report::verbosity`]: `Reporter` trait, `Ignore` and `Verbosity`
//!
//! ## Configuration ([`config`])
//! - [`config::settings`]: `CleanupConfig` loading
//! - [`config::types`]: error enum and shared types
//!
//! # Guarantees
//!
//! 1. **Every path is attempted** - one failure never stops the rest
//! 2. **Nothing escapes** - failures become messages, never errors or panics
//! 3. **Absence is success** - a missing path is skipped silently
//! 4. **Links are not followed** - a symlink is unlinked, its target kept
//! 5. **Normal exit only** - killed or aborted processes skip cleanup

// Configuration
pub mod config;

// Diagnostics
pub mod report;

// Safety & Cleanup
pub mod safety;

// Exit machinery
pub mod exit;

// CLI entrypoint for the reap binary
pub mod cli;

pub use config::settings::CleanupConfig;
pub use config::types::{CleanupError, PathKind, RemovalPolicy, RemovalStrategy, Result};
pub use exit::ExitHooks;
pub use report::{Ignore, Reporter, Verbosity};
pub use safety::{delete_on_exit, CleanupOutcome, CleanupReport, Deleter};
