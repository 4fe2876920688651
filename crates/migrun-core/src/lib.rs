//! migrun core - backend-agnostic migration runner
//!
//! This crate provides:
//! - The migration script model and goose-format parser
//! - Script sources (in-memory, directory) and filters
//! - Bounded readiness probing
//! - The runner that applies pending scripts under the allow-missing policy
//! - The error and structured logging facilities shared by every crate
//!
//! Database backends live in `migrun-store` and plug in through the
//! [`MigrationTarget`] and [`Probe`] traits.

pub mod errors;
pub mod logging_facility;
pub mod readiness;
pub mod runner;
pub mod script;
pub mod source;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, MigrunError, Result};
pub use readiness::{await_ready, Probe, RetryPolicy};
pub use runner::{MigrationTarget, Migrator, Plan, ScriptState, ScriptStatus, VERSION_TABLE};
pub use script::{AppliedMigration, MigrationScript};
pub use source::{
    skip_file_containing, skip_file_named, DirSource, Filtered, MemorySource, ScriptSource,
    ScriptSourceExt,
};
