//! # cohort
//!
//! RFID room occupancy tracker.
//!
//! ```bash
//! # Register cards at the desk
//! cohort register
//!
//! # Track people going in and out
//! cohort tracker --db-path /var/lib/cohort/db.sqlite3
//!
//! # Who is inside right now?
//! cohort status --json
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::process::ExitCode;

use clap::Parser;
use cohort_cli::{cli::Cli, commands, logging};
use colored::Colorize;
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init(&cli.log_target()) {
        eprintln!("failed to initialise logging: {err:#}");
        return ExitCode::FAILURE;
    }

    info!(version = env!("CARGO_PKG_VERSION"), command = ?cli.command, "starting cohort");

    match commands::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = commands::exit_code(&err);
            error!(error = %format!("{err:#}"), code, "cohort failed");
            eprintln!("{}", format!("❌ {err:#}").red());
            ExitCode::from(code)
        }
    }
}
