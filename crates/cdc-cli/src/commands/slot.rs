use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use tokio_postgres::Client;

use cdc_core::ReplicationConfig;
use cdc_pg::{connect_postgres, slot};

use crate::config::load_session_config;
use crate::store::build_checkpoint_store;

async fn connect(config_path: &Path) -> Result<(Client, ReplicationConfig)> {
    let session_config = load_session_config(config_path)?;
    let replication_config = cdc_config::to_replication_config(&session_config)?;
    let client = connect_postgres(&replication_config.connection_string, replication_config.tls_mode)
        .await
        .context("failed to connect to Postgres")?;
    Ok((client, replication_config))
}

pub async fn cmd_slot_create(config_path: &Path) -> Result<()> {
    let session_config = load_session_config(config_path)?;
    let (client, mut replication_config) = connect(config_path).await?;
    let checkpoint_store = build_checkpoint_store(&session_config, &replication_config).await?;
    let slot_name = replication_config.resolve_slot_name(checkpoint_store.as_ref()).await?;

    slot::ensure_slot(&client, &slot_name, true).await?;
    println!("{} replication slot {}", "Ready:".green(), slot_name);
    Ok(())
}

pub async fn cmd_slot_drop(config_path: &Path, force: bool) -> Result<()> {
    let session_config = load_session_config(config_path)?;
    let (client, mut replication_config) = connect(config_path).await?;
    let checkpoint_store = build_checkpoint_store(&session_config, &replication_config).await?;
    let slot_name = replication_config.resolve_slot_name(checkpoint_store.as_ref()).await?;

    if force {
        slot::terminate_backend(&client, &slot_name).await?;
    }

    slot::drop_slot(&client, &slot_name).await?;
    println!("{} replication slot {}", "Dropped:".green(), slot_name);
    Ok(())
}

pub async fn cmd_slot_cleanup(config_path: &Path) -> Result<()> {
    let session_config = load_session_config(config_path)?;
    let (client, mut replication_config) = connect(config_path).await?;
    let prefix = replication_config.slot_name_prefix();

    let cleaned = slot::cleanup_orphaned(&client, &prefix).await?;
    println!("{} {} orphaned slot(s) matching {}", "Cleaned:".green(), cleaned, prefix);

    let checkpoint_store = build_checkpoint_store(&session_config, &replication_config).await?;
    let slot_name = replication_config.resolve_slot_name(checkpoint_store.as_ref()).await?;
    slot::create_slot(&client, &slot_name).await?;
    println!("{} replication slot {}", "Recreated:".green(), slot_name);
    Ok(())
}
