//! Magbridge CLI - Command-line interface
//!
//! This binary drives the magnetometer plugin bridge against a simulated
//! device, exposing each plugin operation as a subcommand.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::common::SimArgs;

#[derive(Parser)]
#[command(name = "magbridge")]
#[command(version = magbridge::VERSION)]
#[command(about = "Drive the magnetometer plugin bridge on a simulated device", long_about = None)]
struct Cli {
    #[command(flatten)]
    sim: SimArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show simulated magnetometer details
    Info,

    /// Take a single magnetometer reading
    Read,

    /// Take a single compass heading fix
    Heading,

    /// Measure total magnetic field strength
    Strength,

    /// Stream magnetometer readings until interrupted
    Watch {
        /// Sample interval in milliseconds
        #[arg(long, default_value_t = 100)]
        frequency: u64,
    },

    /// Stream heading updates until interrupted
    WatchHeading {
        /// Sample interval in milliseconds
        #[arg(long, default_value_t = 100)]
        frequency: u64,

        /// Minimum heading change in degrees worth reporting (0 reports all)
        #[arg(long, default_value_t = 0.0)]
        filter: f64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Info => commands::info::run(&cli.sim).await,
        Commands::Read => commands::read::run(&cli.sim).await,
        Commands::Heading => commands::heading::run(&cli.sim).await,
        Commands::Strength => commands::strength::run(&cli.sim).await,
        Commands::Watch { frequency } => commands::watch::run(&cli.sim, frequency).await,
        Commands::WatchHeading { frequency, filter } => {
            commands::watch_heading::run(&cli.sim, frequency, filter).await
        }
    };

    if let Err(e) = result {
        e.exit();
    }
}
