use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use cdc_pg::{connect_postgres, prerequisites, publication, slot};

use crate::config::load_session_config;
use crate::store::build_checkpoint_store;

pub async fn cmd_status(config_path: &Path) -> Result<()> {
    let session_config = load_session_config(config_path)?;
    let mut replication_config = cdc_config::to_replication_config(&session_config)?;

    let client = connect_postgres(&replication_config.connection_string, replication_config.tls_mode)
        .await
        .context("failed to connect to Postgres")?;

    println!("database_id: {}", replication_config.database_id);

    match prerequisites::check_all(&client, &replication_config.tables).await {
        Ok(()) => println!("prerequisites: {}", "ok".green()),
        Err(e) => println!("prerequisites: {} ({e})", "failed".red()),
    }

    let checkpoint_store = build_checkpoint_store(&session_config, &replication_config).await?;
    let slot_name = replication_config.resolve_slot_name(checkpoint_store.as_ref()).await?;
    if slot::slot_exists(&client, &slot_name).await? {
        let active = slot::slot_is_active(&client, &slot_name).await?;
        let lsn = slot::get_confirmed_flush_lsn(&client, &slot_name).await?;
        println!(
            "slot {}: exists, active={}, confirmed_flush_lsn={}",
            slot_name,
            active,
            lsn.as_deref().unwrap_or("none")
        );
    } else {
        println!("slot {}: {}", slot_name, "does not exist".yellow());
    }

    let publication_name = replication_config.resolve_publication_name(checkpoint_store.as_ref()).await?;
    if publication::publication_exists(&client, &publication_name).await? {
        let tables = publication::get_publication_tables(&client, &publication_name).await?;
        println!("publication {}: exists, {} table(s)", publication_name, tables.len());
    } else {
        println!("publication {}: {}", publication_name, "does not exist".yellow());
    }

    Ok(())
}
