//! Command-line interface for triline.

use clap::{Parser, Subcommand, ValueEnum};

/// Triline - tic-tac-toe with local and online play
#[derive(Parser, Debug)]
#[command(name = "triline")]
#[command(about = "Tic-tac-toe with a minimax opponent and online match sync", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Opponent for a local game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Opponent {
    /// Two humans alternating on this device.
    Friend,
    /// The minimax opponent.
    Machine,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a local game in the terminal
    Local {
        /// Who to play against
        #[arg(long, value_enum, default_value_t = Opponent::Machine)]
        opponent: Opponent,

        /// Mark the human plays in machine mode
        #[arg(long, default_value = "X")]
        mark: String,

        /// Participant id to record outcomes under (machine mode only)
        #[arg(long)]
        user: Option<String>,

        /// Path to a TOML config file
        #[arg(long)]
        config: Option<std::path::PathBuf>,
    },

    /// Run two in-process clients through a full online match
    Demo {
        /// Path to a TOML config file
        #[arg(long)]
        config: Option<std::path::PathBuf>,
    },

    /// Show recorded aggregates and history for a participant
    Stats {
        /// Participant id
        #[arg(long)]
        user: String,

        /// Path to the database file
        #[arg(long, default_value = "triline.db")]
        db_path: String,
    },
}
