//! Command line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cohort_core::CardId;

use crate::logging::LogTarget;

/// Track room occupancy with RFID cards.
#[derive(Debug, Parser)]
#[command(name = "cohort", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file [default: platform config dir]/cohort/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQLite store. Overrides `store.path` from the configuration.
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Card reader device. Overrides `reader.device`; stdin when neither is set.
    #[arg(long, global = true, value_name = "PATH")]
    pub device: Option<PathBuf>,

    /// Write JSON logs to daily files in this directory instead of stderr.
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Operator-invoked modes.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Register new members in the cohort.
    Register,

    /// Track occupancy in the cohort.
    Tracker,

    /// Show current occupancy and who is inside.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show a member and their enter/exit history.
    History {
        /// Card to look up.
        card_id: CardId,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Logging destination chosen on the command line.
    #[must_use]
    pub fn log_target(&self) -> LogTarget {
        LogTarget::from_dir(self.log_dir.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tracker_with_db_path() {
        let cli = Cli::try_parse_from(["cohort", "tracker", "--db-path", "/tmp/db.sqlite3"]).unwrap();
        assert_eq!(cli.command, Command::Tracker);
        assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/db.sqlite3")));
        assert_eq!(cli.log_target(), LogTarget::Stderr);
    }

    #[test]
    fn test_parse_history() {
        let cli = Cli::try_parse_from(["cohort", "--log-dir", "logs", "history", "1234", "--json"])
            .unwrap();
        assert_eq!(
            cli.command,
            Command::History {
                card_id: CardId(1234),
                json: true
            }
        );
        assert_eq!(cli.log_target(), LogTarget::Directory(PathBuf::from("logs")));
    }

    #[test]
    fn test_history_requires_numeric_card() {
        assert!(Cli::try_parse_from(["cohort", "history", "abc"]).is_err());
    }

    #[test]
    fn test_history_rejects_card_too_large_to_store() {
        assert!(Cli::try_parse_from(["cohort", "history", "18446744073709551615"]).is_err());

        let cli = Cli::try_parse_from(["cohort", "history", "9223372036854775807"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::History { card_id, .. } if card_id == CardId::MAX
        ));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["cohort"]).is_err());
    }
}
