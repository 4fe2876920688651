//! Migration backends and embedded scripts
//!
//! - `MigrationTarget`/`Probe` for [`SqliteSession`](crate::db::SqliteSession)
//!   and, with the `postgres` feature, [`PgSession`](crate::pg::PgSession)
//! - Embedded SQL migrations for each dialect

mod embedded;
#[cfg(feature = "postgres")]
mod postgres;
mod sqlite;

pub use embedded::{embedded_scripts, Dialect, TEST_DATA_MARKER};

/// DDL for the applied-migration records, valid on both dialects
pub(crate) fn version_table_ddl() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            version BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            checksum TEXT NOT NULL,
            applied_at BIGINT NOT NULL
        )",
        migrun_core::VERSION_TABLE
    )
}
