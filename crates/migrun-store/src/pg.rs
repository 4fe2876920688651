//! PostgreSQL session handle
//!
//! Wraps an `sqlx` connection and a private current-thread tokio runtime so
//! that callers get a plain blocking API. Nothing is spawned; every call
//! drives its future to completion on the calling thread.

use crate::db::{ConnectionParams, SslMode};
use crate::errors::connection_error;
use migrun_core::{MigrunError, Result};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::Connection;
use tokio::runtime::{Builder, Runtime};

impl From<SslMode> for PgSslMode {
    fn from(mode: SslMode) -> Self {
        match mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Allow => PgSslMode::Allow,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
            SslMode::VerifyCa => PgSslMode::VerifyCa,
            SslMode::VerifyFull => PgSslMode::VerifyFull,
        }
    }
}

impl ConnectionParams {
    /// Driver options equivalent to these parameters
    pub fn to_pg_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose())
            .database(&self.dbname)
            .ssl_mode(self.sslmode.into())
    }
}

/// An owned PostgreSQL session
///
/// The underlying connection is opened on first use (or eagerly by
/// [`PgSession::connect`]) and dropped after a failed liveness probe so the
/// next probe reconnects. Dropping the session closes the socket; use
/// [`PgSession::close`] to perform the orderly shutdown handshake.
pub struct PgSession {
    runtime: Runtime,
    options: PgConnectOptions,
    /// Password-free description for log events
    target: String,
    conn: Option<PgConnection>,
}

impl PgSession {
    /// Prepare a session without touching the network
    ///
    /// # Errors
    ///
    /// Returns `Io` if the runtime cannot be created.
    pub fn lazy(params: &ConnectionParams) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MigrunError::io("tokio_runtime", e))?;
        Ok(Self {
            runtime,
            options: params.to_pg_options(),
            target: params.to_string(),
            conn: None,
        })
    }

    /// Open a session and perform the handshake immediately
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the handshake fails. Not retried.
    pub fn connect(params: &ConnectionParams) -> Result<Self> {
        let mut session = Self::lazy(params)?;
        session.parts()?;
        Ok(session)
    }

    /// The runtime and a live connection, connecting if needed
    pub(crate) fn parts(&mut self) -> Result<(&Runtime, &mut PgConnection)> {
        let conn = match &mut self.conn {
            Some(conn) => conn,
            slot @ None => {
                tracing::debug!(
                    component = module_path!(),
                    op = "pg_connect",
                    server = %self.target,
                    "opening PostgreSQL connection"
                );
                let conn = self
                    .runtime
                    .block_on(PgConnection::connect_with(&self.options))
                    .map_err(connection_error)?;
                slot.insert(conn)
            }
        };
        Ok((&self.runtime, conn))
    }

    pub(crate) fn reset(&mut self) {
        self.conn = None;
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Close the connection with the terminate handshake
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the server side reports an error on close.
    pub fn close(mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => self.runtime.block_on(conn.close()).map_err(connection_error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_session_does_not_connect() {
        let params: ConnectionParams = "host=127.0.0.1 port=1".parse().unwrap();
        let session = PgSession::lazy(&params).unwrap();
        assert!(!session.is_connected());
        session.close().unwrap();
    }

    #[test]
    fn test_connect_to_closed_port_is_connection_error() {
        let params: ConnectionParams = "host=127.0.0.1 port=1".parse().unwrap();
        match PgSession::connect(&params) {
            Err(MigrunError::Connection { .. }) => {}
            Err(other) => panic!("expected Connection error, got {:?}", other),
            Ok(_) => panic!("nothing should listen on port 1"),
        }
    }
}
