//! Process termination machinery
//!
//! - [`hooks`]: explicit, host-owned `ExitHooks` coordinator (preferred)
//! - [`at_exit`]: process-wide fallback on the C runtime's `atexit`
//! - [`signals`]: SIGINT/SIGTERM/SIGHUP to shutdown-flag bridge

pub mod at_exit;
pub mod hooks;
pub mod signals;

pub use hooks::{CleanupHandler, ExitHooks};
pub use signals::ShutdownSignals;
