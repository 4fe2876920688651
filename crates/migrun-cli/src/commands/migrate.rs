//! Migrate command
//!
//! Usage: migrun migrate up [--no-allow-missing] [--with-test-data] [--exclude FILE]...
//!        migrun migrate status

use super::{script_source, Session};
use crate::config::Settings;
use clap::{Args, Subcommand};
use migrun_core::{log_op_end, log_op_start, Migrator};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub command: MigrateCommand,
}

#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Apply every pending migration
    Up(UpArgs),
    /// Show applied and pending migrations
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct UpArgs {
    /// Fail instead of applying migrations older than the current version
    #[arg(long)]
    pub no_allow_missing: bool,

    /// Include seed-data scripts
    #[arg(long)]
    pub with_test_data: bool,

    /// Hide a script by file name (repeatable)
    #[arg(long, value_name = "FILE")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Include seed-data scripts
    #[arg(long)]
    pub with_test_data: bool,

    /// Hide a script by file name (repeatable)
    #[arg(long, value_name = "FILE")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Serialize)]
struct UpReport {
    backend: String,
    allow_missing: bool,
    applied: usize,
}

/// Execute migrate command
pub fn execute(settings: &Settings, args: MigrateArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        MigrateCommand::Up(up_args) => execute_up(settings, up_args),
        MigrateCommand::Status(status_args) => execute_status(settings, status_args),
    }
}

/// Apply pending migrations and print a summary
pub(crate) fn run_up(
    settings: &Settings,
    session: &mut Session,
    with_test_data: bool,
    exclude: &[String],
    allow_missing: bool,
) -> migrun_core::Result<usize> {
    let excluded: Vec<String> = settings
        .exclude
        .iter()
        .chain(exclude)
        .cloned()
        .collect();
    let source = script_source(settings, session.dialect(), with_test_data, &excluded)?;
    Migrator::new(source)
        .allow_missing(allow_missing)
        .apply_pending(session.target())
}

fn execute_up(settings: &Settings, args: UpArgs) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    log_op_start!("migrate_up", backend = %settings.backend);

    let mut session = Session::open_ready(settings)?;
    let allow_missing = settings.allow_missing && !args.no_allow_missing;
    let applied = run_up(
        settings,
        &mut session,
        args.with_test_data,
        &args.exclude,
        allow_missing,
    )?;
    session.close()?;

    let report = UpReport {
        backend: settings.backend.to_string(),
        allow_missing,
        applied,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    log_op_end!(
        "migrate_up",
        duration_ms = start.elapsed().as_millis() as u64,
        applied_len = applied as u64
    );
    Ok(())
}

fn execute_status(settings: &Settings, args: StatusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open_ready(settings)?;
    let excluded: Vec<String> = settings
        .exclude
        .iter()
        .chain(&args.exclude)
        .cloned()
        .collect();
    let source = script_source(settings, session.dialect(), args.with_test_data, &excluded)?;
    let rows = Migrator::new(source).status(session.target())?;
    session.close()?;

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
