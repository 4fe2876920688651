//! Subcommands and the helpers they share

pub mod demo;
pub mod migrate;

use crate::config::{Backend, Settings};
use migrun_core::{
    await_ready, skip_file_containing, skip_file_named, DirSource, MigrationTarget, Probe, Result,
    ScriptSource, ScriptSourceExt,
};
use migrun_store::migrations::TEST_DATA_MARKER;
use migrun_store::samples::{self, Approach, SampleAccess};
use migrun_store::{embedded_scripts, Dialect, PgSession, SqliteSession};

/// An open session on whichever backend the settings name
pub enum Session {
    Sqlite(SqliteSession),
    Postgres(PgSession),
}

impl Session {
    /// Open the backend and wait until it answers
    ///
    /// PostgreSQL sessions connect lazily so that every handshake goes
    /// through the readiness loop.
    pub fn open_ready(settings: &Settings) -> Result<Self> {
        let mut session = match &settings.backend {
            Backend::Sqlite(path) => Session::Sqlite(SqliteSession::open(path)?),
            Backend::Postgres(params) => Session::Postgres(PgSession::lazy(params)?),
        };
        await_ready(session.probe(), &settings.retry)?;
        Ok(session)
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Session::Sqlite(_) => Dialect::Sqlite,
            Session::Postgres(_) => Dialect::Postgres,
        }
    }

    fn probe(&mut self) -> &mut dyn Probe {
        match self {
            Session::Sqlite(s) => s,
            Session::Postgres(s) => s,
        }
    }

    pub fn target(&mut self) -> &mut dyn MigrationTarget {
        match self {
            Session::Sqlite(s) => s,
            Session::Postgres(s) => s,
        }
    }

    pub fn samples(&mut self, approach: Approach) -> Box<dyn SampleAccess + '_> {
        match self {
            Session::Sqlite(s) => samples::sqlite::access(s, approach),
            Session::Postgres(s) => samples::postgres::access(s, approach),
        }
    }

    pub fn close(self) -> Result<()> {
        match self {
            Session::Sqlite(s) => s.close(),
            Session::Postgres(s) => s.close(),
        }
    }
}

/// The scripts a run should see
///
/// Seed-data scripts are hidden unless `with_test_data` is set; files named
/// in `exclude` are always hidden.
pub fn script_source(
    settings: &Settings,
    dialect: Dialect,
    with_test_data: bool,
    exclude: &[String],
) -> Result<impl ScriptSource> {
    let base: Box<dyn ScriptSource> = match &settings.scripts_dir {
        Some(dir) => Box::new(DirSource::new(dir)),
        None => Box::new(embedded_scripts(dialect)?),
    };

    let seed = skip_file_containing(TEST_DATA_MARKER);
    let excluded: Vec<_> = exclude
        .iter()
        .map(|name| skip_file_named(name.clone()))
        .collect();
    Ok(base.skip_if(move |script| {
        (!with_test_data && seed(script)) || excluded.iter().any(|skip| skip(script))
    }))
}
