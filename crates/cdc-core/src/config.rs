//! The validated, ready-to-use configuration a [`crate::checkpoint`] consumer
//! hands to a replication session (§3 ReplicationConfig).

use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointStore;
use crate::error::{Error, Result};
use crate::ident::sanitize;
use crate::transform::TransformationRule;

/// Length, in hex characters, of the random component appended to a derived
/// slot/publication name.
const RANDOM_SUFFIX_LEN: usize = 8;

fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..RANDOM_SUFFIX_LEN].to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TlsMode {
    Disable,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl Default for TlsMode {
    fn default() -> Self {
        TlsMode::Prefer
    }
}

/// Fully resolved configuration for one replication session.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    pub connection_string: String,
    pub tls_mode: TlsMode,
    /// Stable identifier for this CDC consumer; the replication slot and
    /// publication names are derived from it unless overridden below.
    pub database_id: String,
    pub tables: Vec<String>,
    pub transformation_rules: Vec<TransformationRule>,
    /// Pre-chosen slot name, bypassing derivation from `database_id`.
    pub slot_name_override: Option<String>,
    /// Pre-chosen publication name, bypassing derivation from `database_id`.
    pub publication_name_override: Option<String>,
    /// Base URL of the out-of-process transformation service, if any
    /// `RuleKind::Remote` rule is configured. Unused when no such rule exists.
    pub transform_service_url: Option<String>,
    /// Whether to set `REPLICA IDENTITY FULL` on every published table
    /// during provisioning. Defaults to `true`.
    pub replica_identity_full: bool,
}

impl ReplicationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.connection_string.trim().is_empty() {
            return Err(Error::ConfigInvalid("connection_string must not be empty".into()));
        }
        if self.database_id.trim().is_empty() {
            return Err(Error::ConfigInvalid("database_id must not be empty".into()));
        }
        if self.tables.is_empty() {
            return Err(Error::ConfigInvalid("at least one table must be configured".into()));
        }
        Ok(())
    }

    /// Slot name: the override if one was supplied, else whatever was last
    /// resolved by [`Self::resolve_slot_name`]. Before that has ever run,
    /// falls back to the un-suffixed prefix (not a name PostgreSQL should be
    /// asked to create).
    pub fn slot_name(&self) -> String {
        self.slot_name_override.clone().unwrap_or_else(|| self.slot_name_prefix())
    }

    /// Publication name: the override if one was supplied, else whatever was
    /// last resolved by [`Self::resolve_publication_name`].
    pub fn publication_name(&self) -> String {
        self.publication_name_override.clone().unwrap_or_else(|| self.publication_name_prefix())
    }

    /// Fixed, non-random prefix every derived slot name begins with. Used to
    /// find orphaned slots for this `database_id` regardless of the random
    /// suffix any one of them was given.
    pub fn slot_name_prefix(&self) -> String {
        format!("cdc_slot_{}", sanitize(&self.database_id))
    }

    /// Fixed, non-random prefix every derived publication name begins with.
    pub fn publication_name_prefix(&self) -> String {
        format!("cdc_pub_{}", sanitize(&self.database_id))
    }

    /// Resolve the slot name to actually use: the override if one was
    /// supplied; otherwise a name previously chosen for this `database_id`
    /// and persisted via `store`; otherwise a freshly generated
    /// `{prefix}_{random}` name, persisted so later calls (including after a
    /// restart) reuse it instead of generating a new one. Populates
    /// `slot_name_override` as a side effect so subsequent calls to
    /// [`Self::slot_name`] return the resolved value without consulting the
    /// store again.
    pub async fn resolve_slot_name(&mut self, store: &dyn CheckpointStore) -> Result<String> {
        self.resolve_name("slot", &self.slot_name_prefix(), self.slot_name_override.clone(), store)
            .await
            .map(|name| {
                self.slot_name_override = Some(name.clone());
                name
            })
    }

    /// Resolve the publication name the same way as [`Self::resolve_slot_name`].
    pub async fn resolve_publication_name(&mut self, store: &dyn CheckpointStore) -> Result<String> {
        self.resolve_name(
            "publication",
            &self.publication_name_prefix(),
            self.publication_name_override.clone(),
            store,
        )
        .await
        .map(|name| {
            self.publication_name_override = Some(name.clone());
            name
        })
    }

    async fn resolve_name(
        &self,
        kind: &str,
        prefix: &str,
        override_value: Option<String>,
        store: &dyn CheckpointStore,
    ) -> Result<String> {
        if let Some(name) = override_value {
            return Ok(name);
        }

        if let Some(existing) = store
            .load_resolved_name(&self.database_id, kind)
            .await
            .map_err(|e| Error::ConfigInvalid(format!("failed to load resolved {kind} name: {e}")))?
        {
            return Ok(existing);
        }

        let name = format!("{prefix}_{}", random_suffix());
        store
            .save_resolved_name(&self.database_id, kind, &name)
            .await
            .map_err(|e| Error::ConfigInvalid(format!("failed to persist resolved {kind} name: {e}")))?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReplicationConfig {
        ReplicationConfig {
            connection_string: "postgres://localhost/db".into(),
            tls_mode: TlsMode::Prefer,
            database_id: "Acme Corp".into(),
            tables: vec!["public.users".into()],
            transformation_rules: vec![],
            slot_name_override: None,
            publication_name_override: None,
            transform_service_url: None,
            replica_identity_full: true,
        }
    }

    #[test]
    fn test_validate_rejects_empty_tables() {
        let mut config = sample();
        config.tables.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_derived_names_are_sanitized_and_stable() {
        let config = sample();
        assert_eq!(config.slot_name(), "cdc_slot_acme_corp");
        assert_eq!(config.publication_name(), "cdc_pub_acme_corp");
    }

    #[test]
    fn test_overrides_bypass_derivation() {
        let mut config = sample();
        config.slot_name_override = Some("my_slot".into());
        config.publication_name_override = Some("my_pub".into());
        assert_eq!(config.slot_name(), "my_slot");
        assert_eq!(config.publication_name(), "my_pub");
    }

    #[tokio::test]
    async fn test_resolve_slot_name_adds_random_suffix() {
        let store = crate::checkpoint::InMemoryCheckpointStore::new();
        let mut config = sample();
        let resolved = config.resolve_slot_name(&store).await.unwrap();
        assert!(resolved.starts_with("cdc_slot_acme_corp_"));
        assert_ne!(resolved, config.slot_name_prefix());
        assert_eq!(config.slot_name(), resolved);
    }

    #[tokio::test]
    async fn test_resolve_slot_name_is_stable_across_resolutions() {
        let store = crate::checkpoint::InMemoryCheckpointStore::new();
        let first = sample().resolve_slot_name(&store).await.unwrap();
        // A second, freshly constructed config for the same database_id
        // (simulating a restart) must reuse the persisted name rather than
        // generating a new random suffix.
        let second = sample().resolve_slot_name(&store).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_resolve_slot_name_honors_override() {
        let store = crate::checkpoint::InMemoryCheckpointStore::new();
        let mut config = sample();
        config.slot_name_override = Some("my_slot".into());
        assert_eq!(config.resolve_slot_name(&store).await.unwrap(), "my_slot");
        assert_eq!(store.load_resolved_name("Acme Corp", "slot").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_publication_name_independent_of_slot() {
        let store = crate::checkpoint::InMemoryCheckpointStore::new();
        let mut config = sample();
        let slot = config.resolve_slot_name(&store).await.unwrap();
        let publication = config.resolve_publication_name(&store).await.unwrap();
        assert!(publication.starts_with("cdc_pub_acme_corp_"));
        assert_ne!(slot, publication);
    }
}
