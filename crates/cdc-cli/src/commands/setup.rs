use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use cdc_core::TlsMode;
use cdc_pg::{connect_postgres, prerequisites, publication, slot};

use crate::config::load_session_config;
use crate::store::build_checkpoint_store;

pub async fn cmd_setup(config_path: &Path) -> Result<()> {
    let session_config = load_session_config(config_path)?;
    let mut replication_config = cdc_config::to_replication_config(&session_config)?;

    println!("Connecting to {}...", replication_config.connection_string.split('@').last().unwrap_or("database"));
    let client = connect_postgres(&replication_config.connection_string, replication_config.tls_mode)
        .await
        .context("failed to connect to Postgres")?;

    println!("Checking prerequisites...");
    prerequisites::check_all(&client, &replication_config.tables)
        .await
        .context("prerequisite check failed")?;
    println!("{}", "Prerequisites satisfied".green());

    let checkpoint_store = build_checkpoint_store(&session_config, &replication_config).await?;
    let slot_name = replication_config.resolve_slot_name(checkpoint_store.as_ref()).await?;
    let publication_name = replication_config.resolve_publication_name(checkpoint_store.as_ref()).await?;

    slot::ensure_slot(&client, &slot_name, true).await.context("failed to provision replication slot")?;
    println!("{} replication slot {}", "Ready:".green(), slot_name);

    publication::ensure_publication(&client, &publication_name, &replication_config.tables, true)
        .await
        .context("failed to provision publication")?;
    println!("{} publication {}", "Ready:".green(), publication_name);

    if replication_config.replica_identity_full {
        for table_ref in &replication_config.tables {
            slot::set_replica_identity_full(&client, table_ref).await?;
        }
        println!("{} REPLICA IDENTITY FULL on {} table(s)", "Set:".green(), replication_config.tables.len());
    }

    if replication_config.tls_mode == TlsMode::Disable {
        println!("\n{}", "Note: connecting without TLS".yellow());
    }

    println!("\n{}", "Setup complete.".green().bold());
    Ok(())
}
