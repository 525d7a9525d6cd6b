mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing::Level;

use commands::allocation::{AllocateArgs, ShuArgs};
use commands::loans::{ScheduleArgs, SimulateArgs};

/// Loan simulations and SHU allocation for cooperatives
#[derive(Parser)]
#[command(
    name = "kop",
    version,
    about = "Loan simulations and SHU allocation for cooperatives",
    long_about = "A CLI for the calculation behind a cooperative back office's simulation \
                  screens, with decimal precision. Supports flat-rate installment \
                  schedules, loan product simulations, proportional fund allocation \
                  and SHU distribution."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a flat-rate installment schedule
    Schedule(ScheduleArgs),
    /// Simulate a loan against a product (limits, fees, due dates)
    Simulate(SimulateArgs),
    /// Split a fund across members in proportion to their basis
    Allocate(AllocateArgs),
    /// Distribute SHU across components and members
    Shu(ShuArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Schedule(args) => commands::loans::run_schedule(args),
        Commands::Simulate(args) => commands::loans::run_simulate(args),
        Commands::Allocate(args) => commands::allocation::run_allocate(args),
        Commands::Shu(args) => commands::allocation::run_shu(args),
        Commands::Version => {
            println!("kop {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
