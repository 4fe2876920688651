//! migrun store - concrete database backends
//!
//! Provides:
//! - Connection parameters and session handles for SQLite and PostgreSQL
//! - `MigrationTarget`/`Probe` implementations for both backends
//! - Embedded migration scripts per SQL dialect
//! - The sample-table data-access demonstrations

pub mod db;
pub mod errors;
pub mod migrations;
#[cfg(feature = "postgres")]
pub mod pg;
pub mod samples;

pub use db::{ConnectionParams, SqliteSession, SslMode};
pub use migrations::{embedded_scripts, Dialect};
#[cfg(feature = "postgres")]
pub use pg::PgSession;
