//! migrun CLI
//!
//! Waits for the database, applies versioned SQL migrations and runs the
//! sample-table demonstrations.

use clap::{Parser, Subcommand};
use migrun_core::logging_facility::{init, Profile};
use migrun_core_types::RunId;

mod commands;
mod config;

#[derive(Debug, Parser)]
#[command(name = "migrun")]
#[command(about = "migrun - versioned SQL migrations with a readiness wait", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: config::GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Migration operations
    Migrate(commands::migrate::MigrateArgs),
    /// Migrate, then exercise every data-access approach
    Demo(commands::demo::DemoArgs),
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config::Settings::resolve(&cli.global, env_var)?;
    match cli.command {
        Commands::Migrate(args) => commands::migrate::execute(&settings, args),
        Commands::Demo(args) => commands::demo::execute(&settings, args),
    }
}

fn main() {
    // A missing .env file is not an error
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init(if cli.global.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });

    let run_id = RunId::new();
    let span = tracing::info_span!("run", run_id = %run_id);
    let _enter = span.enter();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
