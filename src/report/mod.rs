//! Diagnostic reporting
//!
//! The verbosity collaborator the cleanup registry reports through.

pub mod verbosity;

pub use verbosity::{Ignore, Reporter, Verbosity};
