//! PostgreSQL migration backend
//!
//! Scripts are sent with the simple query protocol so a single Up block may
//! hold several statements.

use super::version_table_ddl;
use crate::errors::{connection_error, from_sqlx};
use crate::pg::PgSession;
use migrun_core::{
    AppliedMigration, MigrationScript, MigrationTarget, Probe, Result, VERSION_TABLE,
};
use sqlx::{Connection, Executor, Row};

impl Probe for PgSession {
    fn ping(&mut self) -> Result<()> {
        let result = self.parts().and_then(|(runtime, conn)| {
            runtime.block_on(conn.ping()).map_err(connection_error)
        });
        if result.is_err() {
            // Next probe starts from a fresh handshake
            self.reset();
        }
        result
    }
}

impl MigrationTarget for PgSession {
    fn ensure_version_table(&mut self) -> Result<()> {
        let (runtime, conn) = self.parts()?;
        let ddl = version_table_ddl();
        runtime
            .block_on((&mut *conn).execute(ddl.as_str()))
            .map(|_| ())
            .map_err(|e| from_sqlx("ensure_version_table", e))
    }

    fn applied(&mut self) -> Result<Vec<AppliedMigration>> {
        let (runtime, conn) = self.parts()?;
        let sql = format!(
            "SELECT version, name, checksum, applied_at FROM {} ORDER BY version",
            VERSION_TABLE
        );
        let rows = runtime
            .block_on(sqlx::query(&sql).fetch_all(&mut *conn))
            .map_err(|e| from_sqlx("read_applied", e))?;

        rows.iter()
            .map(|row| {
                Ok(AppliedMigration {
                    version: row.try_get("version")?,
                    name: row.try_get("name")?,
                    checksum: row.try_get("checksum")?,
                    applied_at: row.try_get("applied_at")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| from_sqlx("read_applied", e))
    }

    fn apply(&mut self, script: &MigrationScript) -> Result<()> {
        let (runtime, conn) = self.parts()?;
        let record = format!(
            "INSERT INTO {} (version, name, checksum, applied_at) VALUES ($1, $2, $3, $4)",
            VERSION_TABLE
        );
        let now = chrono::Utc::now().timestamp();

        runtime.block_on(async {
            if script.no_transaction {
                (&mut *conn)
                    .execute(script.up_sql.as_str())
                    .await
                    .map_err(|e| from_sqlx("apply", e))?;
                sqlx::query(&record)
                    .bind(script.version)
                    .bind(&script.name)
                    .bind(&script.checksum)
                    .bind(now)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| from_sqlx("record_applied", e))?;
                return Ok(());
            }

            // Dropping the transaction on error rolls it back
            let mut tx = conn.begin().await.map_err(|e| from_sqlx("begin", e))?;
            (&mut *tx)
                .execute(script.up_sql.as_str())
                .await
                .map_err(|e| from_sqlx("apply", e))?;
            sqlx::query(&record)
                .bind(script.version)
                .bind(&script.name)
                .bind(&script.checksum)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| from_sqlx("record_applied", e))?;
            tx.commit().await.map_err(|e| from_sqlx("commit", e))
        })
    }
}
