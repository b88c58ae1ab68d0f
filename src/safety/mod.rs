//! Safety and cleanup
//!
//! The exit-time cleanup registry and the removal primitives behind it.

pub mod outcome;
pub mod registry;
pub mod removal;

pub use outcome::{CleanupEntry, CleanupOutcome, CleanupReport};
pub use registry::{delete_on_exit, Deleter};
