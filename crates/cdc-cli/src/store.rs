//! Builds the checkpoint store a session config describes (§3.1
//! `CheckpointConfig`). Shared by every command that needs the slot and
//! publication names actually resolved for a `database_id`, not just their
//! un-suffixed prefix.

use std::sync::Arc;

use anyhow::{Context, Result};

use cdc_config::{CheckpointBackend, SessionConfig};
use cdc_core::checkpoint::{CheckpointStore, InMemoryCheckpointStore};
use cdc_pg::{connect_postgres, PostgresCheckpointStore};

pub async fn build_checkpoint_store(
    session_config: &SessionConfig,
    replication_config: &cdc_core::ReplicationConfig,
) -> Result<Arc<dyn CheckpointStore>> {
    match session_config.checkpoint.backend {
        CheckpointBackend::Memory => Ok(Arc::new(InMemoryCheckpointStore::new())),
        CheckpointBackend::Postgres => {
            let table = session_config
                .checkpoint
                .table
                .clone()
                .context("checkpoint.table is required when backend is postgres")?;
            let client = connect_postgres(&replication_config.connection_string, replication_config.tls_mode)
                .await
                .context("failed to connect checkpoint store")?;
            Ok(Arc::new(PostgresCheckpointStore::new(client, table).await?))
        }
    }
}
