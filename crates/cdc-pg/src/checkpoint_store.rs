//! Postgres-backed implementation of `cdc_core::checkpoint::CheckpointStore`.
//!
//! Keeps a single row per slot in a checkpoints table, created on first use.

use async_trait::async_trait;
use tokio_postgres::Client;

use cdc_core::checkpoint::CheckpointStore;
use cdc_core::error::{Error, Result};
use cdc_core::Lsn;

/// Persists checkpoints in a Postgres table, one row per slot name.
pub struct PostgresCheckpointStore {
    client: Client,
    table: String,
}

impl PostgresCheckpointStore {
    /// Connect using `client` and ensure `table` exists. `table` is not
    /// user-supplied-SQL-interpolated from request data, only from session
    /// configuration, but is still quoted defensively.
    pub async fn new(client: Client, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        let store = Self { client, table };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                slot_name TEXT PRIMARY KEY,
                lsn BIGINT NOT NULL,
                updated_at TIMESTAMPTZ DEFAULT NOW()
            )
            "#,
            cdc_core::ident::quote(&self.table)
        );

        self.client
            .execute(&ddl, &[])
            .await
            .map_err(|e| Error::CheckpointFailed(e.to_string()))?;

        let names_ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                database_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                updated_at TIMESTAMPTZ DEFAULT NOW(),
                PRIMARY KEY (database_id, kind)
            )
            "#,
            cdc_core::ident::quote(&self.names_table())
        );

        self.client
            .execute(&names_ddl, &[])
            .await
            .map_err(|e| Error::CheckpointFailed(e.to_string()))?;

        Ok(())
    }

    /// Name of the sibling table that holds resolved slot/publication names,
    /// derived from the checkpoint table name so one `table` config value
    /// provisions both.
    fn names_table(&self) -> String {
        format!("{}_names", self.table)
    }
}

#[async_trait]
impl CheckpointStore for PostgresCheckpointStore {
    async fn save(&self, slot_name: &str, lsn: Lsn) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {} (slot_name, lsn, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (slot_name) DO UPDATE SET lsn = $2, updated_at = NOW()
            "#,
            cdc_core::ident::quote(&self.table)
        );

        self.client
            .execute(&sql, &[&slot_name, &(lsn.as_u64() as i64)])
            .await
            .map_err(|e| Error::CheckpointFailed(e.to_string()))?;

        Ok(())
    }

    async fn load(&self, slot_name: &str) -> Result<Option<Lsn>> {
        let sql = format!(
            "SELECT lsn FROM {} WHERE slot_name = $1",
            cdc_core::ident::quote(&self.table)
        );

        let row = self
            .client
            .query_opt(&sql, &[&slot_name])
            .await
            .map_err(|e| Error::CheckpointFailed(e.to_string()))?;

        Ok(row.map(|r| Lsn::from(r.get::<_, i64>(0) as u64)))
    }

    async fn save_resolved_name(&self, database_id: &str, kind: &str, name: &str) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {} (database_id, kind, name, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (database_id, kind) DO UPDATE SET name = $3, updated_at = NOW()
            "#,
            cdc_core::ident::quote(&self.names_table())
        );

        self.client
            .execute(&sql, &[&database_id, &kind, &name])
            .await
            .map_err(|e| Error::CheckpointFailed(e.to_string()))?;

        Ok(())
    }

    async fn load_resolved_name(&self, database_id: &str, kind: &str) -> Result<Option<String>> {
        let sql = format!(
            "SELECT name FROM {} WHERE database_id = $1 AND kind = $2",
            cdc_core::ident::quote(&self.names_table())
        );

        let row = self
            .client
            .query_opt(&sql, &[&database_id, &kind])
            .await
            .map_err(|e| Error::CheckpointFailed(e.to_string()))?;

        Ok(row.map(|r| r.get(0)))
    }
}
