// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handoff - human-handoff engine for customer chat.
//!
//! This is the binary entry point for the Handoff scheduler.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod collaborators;
mod serve;
mod status;

/// Handoff - human-handoff engine for customer chat.
#[derive(Parser, Debug)]
#[command(name = "handoff", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Handoff engine with background sweeps.
    Serve,
    /// Print queue and SLA statistics from the configured database.
    Status {
        /// Trailing window for SLA metrics, in days.
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Print the merged effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match handoff_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            handoff_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { days }) => status::run_status(config, days).await,
        Some(Commands::Config) => {
            match toml::to_string_pretty(&config) {
                Ok(rendered) => {
                    println!("{rendered}");
                    Ok(())
                }
                Err(e) => Err(handoff_core::HandoffError::Internal(e.to_string())),
            }
        }
        None => {
            println!("handoff: use --help for available commands");
            Ok(())
        }
    };

    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
