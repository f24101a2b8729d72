pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "staybook",
    about = "Staybook operator CLI",
    long_about = "Operate the Staybook booking store: migrations, demo data, price quotes, config inspection, and readiness checks.",
    after_help = "Examples:\n  staybook doctor --json\n  staybook seed\n  staybook quote PR-LAKE-1 2026-01-05 2026-01-07 --guests 2"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo hosts, guests, and properties (idempotent)")]
    Seed,
    #[command(about = "Price a stay at a listed property and report calendar conflicts")]
    Quote {
        #[arg(help = "Property id, e.g. PR-LAKE-1")]
        property: String,
        #[arg(help = "Check-in date (YYYY-MM-DD)")]
        check_in: String,
        #[arg(help = "Check-out date (YYYY-MM-DD)")]
        check_out: String,
        #[arg(long, default_value_t = 1, help = "Number of guests")]
        guests: u32,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, schema, and gateway readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Quote { property, check_in, check_out, guests } => {
            commands::quote::run(commands::quote::QuoteArgs {
                property,
                check_in,
                check_out,
                guests,
            })
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
