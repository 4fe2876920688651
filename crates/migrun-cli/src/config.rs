//! Configuration layering
//!
//! Flags win over environment variables (a `.env` file is loaded into the
//! environment first), which win over the TOML file named by `--config`,
//! which wins over built-in defaults.

use clap::Args;
use migrun_core::{MigrunError, Result, RetryPolicy};
use migrun_store::ConnectionParams;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_SQLITE: &str = "MIGRUN_SQLITE";

/// Options shared by every subcommand
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// SQLite database file to use instead of PostgreSQL
    #[arg(long, global = true, conflicts_with = "dsn")]
    pub sqlite: Option<PathBuf>,

    /// PostgreSQL connection string (keyword form or postgres:// URL)
    #[arg(long, global = true)]
    pub dsn: Option<String>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Readiness probes before giving up
    #[arg(long, global = true)]
    pub attempts: Option<u32>,

    /// Pause between readiness probes, in milliseconds
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    /// Read migration scripts from this directory instead of the embedded set
    #[arg(long, global = true)]
    pub scripts: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Contents of the `--config` file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub sqlite: Option<PathBuf>,
    pub dsn: Option<String>,
    pub postgres: Option<ConnectionParams>,
    pub scripts_dir: Option<PathBuf>,
    pub allow_missing: Option<bool>,
    pub exclude: Vec<String>,
    pub retry: RetryConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub attempts: Option<u32>,
    pub interval_ms: Option<u64>,
}

impl FileConfig {
    /// Read and parse a TOML file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `Config` if it does not
    /// parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MigrunError::io(format!("read {}", path.display()), e))?;
        toml::from_str(&text)
            .map_err(|e| MigrunError::config(format!("{}: {}", path.display(), e)))
    }
}

/// Which database to talk to
#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    Sqlite(PathBuf),
    Postgres(ConnectionParams),
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite(path) => write!(f, "sqlite:{}", path.display()),
            Backend::Postgres(params) => write!(f, "postgres:{}", params),
        }
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: Backend,
    pub retry: RetryPolicy,
    pub scripts_dir: Option<PathBuf>,
    pub allow_missing: bool,
    pub exclude: Vec<String>,
}

impl Settings {
    /// Merge flags, environment and the optional config file
    ///
    /// `env` looks up one variable; empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unparseable connection string or config
    /// file, and `Io` if the config file cannot be read.
    pub fn resolve<E>(args: &GlobalArgs, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let env = |key: &str| env(key).filter(|v| !v.is_empty());

        let backend = if let Some(path) = &args.sqlite {
            Backend::Sqlite(path.clone())
        } else if let Some(dsn) = &args.dsn {
            Backend::Postgres(dsn.parse()?)
        } else if let Some(path) = env(ENV_SQLITE) {
            Backend::Sqlite(PathBuf::from(path))
        } else if let Some(dsn) = env(ENV_DATABASE_URL) {
            Backend::Postgres(dsn.parse()?)
        } else if let Some(path) = file.sqlite {
            Backend::Sqlite(path)
        } else if let Some(dsn) = file.dsn {
            Backend::Postgres(dsn.parse()?)
        } else {
            Backend::Postgres(file.postgres.unwrap_or_default())
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy::new(
            args.attempts
                .or(file.retry.attempts)
                .unwrap_or(defaults.max_attempts),
            args.interval_ms
                .or(file.retry.interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
        );

        Ok(Self {
            backend,
            retry,
            scripts_dir: args.scripts.clone().or(file.scripts_dir),
            allow_missing: file.allow_missing.unwrap_or(true),
            exclude: file.exclude,
        })
    }
}
