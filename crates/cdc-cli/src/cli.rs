use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cdc-cli")]
#[command(about = "Operate a Postgres logical-replication CDC engine")]
#[command(version)]
pub struct Cli {
    /// Environment to load (loads .env.{ENV} instead of .env)
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scaffold a session config file and a .env template in the current directory
    Init {
        /// Database identifier used to seed the generated config
        #[arg(default_value = "my_database")]
        name: String,
    },

    /// Create the replication slot and publication a config describes
    Setup {
        #[arg(long, short, default_value = "cdc.toml")]
        config: PathBuf,
    },

    /// Start a replication session and stream events to stdout
    Run {
        #[arg(long, short, default_value = "cdc.toml")]
        config: PathBuf,

        /// Create the replication slot if it doesn't exist
        #[arg(long)]
        create_slot: bool,

        /// Terminate and drop any orphaned slot left behind by a prior crashed
        /// session for this database before provisioning a fresh one
        #[arg(long)]
        cleanup: bool,

        /// Apply events to this target connection string instead of printing them
        #[arg(long)]
        apply: Option<String>,
    },

    /// Show prerequisite checks and current slot/publication state
    Status {
        #[arg(long, short, default_value = "cdc.toml")]
        config: PathBuf,
    },

    /// Manage the replication slot directly
    Slot {
        #[command(subcommand)]
        command: SlotCommands,
    },
}

#[derive(Subcommand)]
pub enum SlotCommands {
    /// Create the slot a config describes, if it doesn't already exist
    Create {
        #[arg(long, short, default_value = "cdc.toml")]
        config: PathBuf,
    },

    /// Drop the slot a config describes
    Drop {
        #[arg(long, short, default_value = "cdc.toml")]
        config: PathBuf,

        /// Terminate the backend holding the slot first, if any
        #[arg(long)]
        force: bool,
    },

    /// Terminate any backend holding the slot and recreate it from scratch
    Cleanup {
        #[arg(long, short, default_value = "cdc.toml")]
        config: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
