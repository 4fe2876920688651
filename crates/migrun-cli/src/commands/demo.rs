//! Demo command
//!
//! Usage: migrun demo [--with-test-data]
//!
//! Migrates, then runs every data-access approach against the sample table
//! and prints what each one reads back.

use super::migrate::run_up;
use super::Session;
use crate::config::Settings;
use clap::Args;
use migrun_core::{log_op_end, log_op_start};
use migrun_store::samples::{render_samples, Approach, NewSample};
use std::time::Instant;

#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Include seed-data scripts when migrating
    #[arg(long)]
    pub with_test_data: bool,
}

/// Execute demo command
pub fn execute(settings: &Settings, args: DemoArgs) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    log_op_start!("demo", backend = %settings.backend);

    let mut session = Session::open_ready(settings)?;
    let applied = run_up(
        settings,
        &mut session,
        args.with_test_data,
        &[],
        settings.allow_missing,
    );
    let closed = session.close();
    let applied = applied?;
    closed?;
    println!("Applied {} migration(s)", applied);

    for approach in Approach::ALL {
        run_approach(settings, approach)?;
    }

    log_op_end!("demo", duration_ms = start.elapsed().as_millis() as u64);
    Ok(())
}

/// One approach against its own session, closed before returning
fn run_approach(
    settings: &Settings,
    approach: Approach,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open_ready(settings)?;
    let outcome = exercise(&mut session, approach);
    let closed = session.close();
    outcome?;
    closed?;
    Ok(())
}

fn exercise(session: &mut Session, approach: Approach) -> Result<(), Box<dyn std::error::Error>> {
    let mut access = session.samples(approach);

    let inserted =
        access.insert(&NewSample::named("Test Sample").with_description("Test Description"))?;
    println!("Inserted {} row(s) via {}", inserted, approach);

    let rows = access.select_all()?;
    println!("{}", render_samples(approach.label(), &rows)?);

    let returned = access.insert_returning(
        &NewSample::named("Test Sample Returning")
            .with_description("Test Description Returning")
            .with_int_example(42),
    )?;
    let label = format!("{} insert returning", approach.label());
    println!("{}", render_samples(&label, &returned)?);
    Ok(())
}
