//! SQLite migration backend

use super::version_table_ddl;
use crate::db::SqliteSession;
use crate::errors::{connection_error, from_rusqlite};
use migrun_core::{
    AppliedMigration, MigrationScript, MigrationTarget, Probe, Result, VERSION_TABLE,
};

impl Probe for SqliteSession {
    fn ping(&mut self) -> Result<()> {
        self.connection()
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(connection_error)
    }
}

impl MigrationTarget for SqliteSession {
    fn ensure_version_table(&mut self) -> Result<()> {
        self.connection()
            .execute_batch(&version_table_ddl())
            .map_err(|e| from_rusqlite("ensure_version_table", e))
    }

    fn applied(&mut self) -> Result<Vec<AppliedMigration>> {
        let conn = self.connection();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT version, name, checksum, applied_at FROM {} ORDER BY version",
                VERSION_TABLE
            ))
            .map_err(|e| from_rusqlite("read_applied", e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AppliedMigration {
                    version: row.get(0)?,
                    name: row.get(1)?,
                    checksum: row.get(2)?,
                    applied_at: row.get(3)?,
                })
            })
            .map_err(|e| from_rusqlite("read_applied", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| from_rusqlite("read_applied", e))?;
        Ok(rows)
    }

    fn apply(&mut self, script: &MigrationScript) -> Result<()> {
        let record = format!(
            "INSERT INTO {} (version, name, checksum, applied_at) VALUES (?1, ?2, ?3, ?4)",
            VERSION_TABLE
        );
        let now = chrono::Utc::now().timestamp();
        let params = rusqlite::params![script.version, script.name, script.checksum, now];

        if script.no_transaction {
            let conn = self.connection();
            conn.execute_batch(&script.up_sql)
                .map_err(|e| from_rusqlite("apply", e))?;
            conn.execute(&record, params)
                .map_err(|e| from_rusqlite("record_applied", e))?;
            return Ok(());
        }

        // Dropping the transaction on error rolls it back
        let tx = self
            .connection_mut()
            .transaction()
            .map_err(|e| from_rusqlite("begin", e))?;
        tx.execute_batch(&script.up_sql)
            .map_err(|e| from_rusqlite("apply", e))?;
        tx.execute(&record, params)
            .map_err(|e| from_rusqlite("record_applied", e))?;
        tx.commit().map_err(|e| from_rusqlite("commit", e))
    }
}
