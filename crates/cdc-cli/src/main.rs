mod cli;
mod commands;
mod config;
mod env;
mod store;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, SlotCommands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Err(e) = env::load_dotenv(cli.env.as_deref()) {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    match cli.command {
        Commands::Init { name } => commands::cmd_init(&name).await,
        Commands::Setup { config } => commands::cmd_setup(&config).await,
        Commands::Run { config, create_slot, cleanup, apply } => {
            commands::cmd_run(&config, create_slot, cleanup, apply).await
        }
        Commands::Status { config } => commands::cmd_status(&config).await,
        Commands::Slot { command } => match command {
            SlotCommands::Create { config } => commands::cmd_slot_create(&config).await,
            SlotCommands::Drop { config, force } => commands::cmd_slot_drop(&config, force).await,
            SlotCommands::Cleanup { config } => commands::cmd_slot_cleanup(&config).await,
        },
    }
}
