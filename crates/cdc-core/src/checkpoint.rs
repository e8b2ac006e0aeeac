//! Caller-injected position persistence. The core never writes its own
//! progress to disk; it only calls back into whatever store the host
//! application wired up (§6 checkpoint callback).

use async_trait::async_trait;

use crate::error::Result;
use crate::lsn::Lsn;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist `lsn` as the last position fully processed for `slot_name`.
    async fn save(&self, slot_name: &str, lsn: Lsn) -> Result<()>;

    /// Load the last persisted position for `slot_name`, if any.
    async fn load(&self, slot_name: &str) -> Result<Option<Lsn>>;

    /// Persist a derived identifier (e.g. a randomly-suffixed slot or
    /// publication name) chosen once for `database_id`/`kind` so later
    /// connects reuse it instead of generating a new random suffix.
    async fn save_resolved_name(&self, database_id: &str, kind: &str, name: &str) -> Result<()>;

    /// Load a previously persisted resolved name for `database_id`/`kind`.
    async fn load_resolved_name(&self, database_id: &str, kind: &str) -> Result<Option<String>>;
}

/// Keeps positions in memory only; useful for tests and for callers that
/// rely entirely on the replication slot's own server-side position.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    positions: std::sync::Mutex<std::collections::HashMap<String, Lsn>>,
    resolved_names: std::sync::Mutex<std::collections::HashMap<(String, String), String>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, slot_name: &str, lsn: Lsn) -> Result<()> {
        self.positions.lock().unwrap().insert(slot_name.to_string(), lsn);
        Ok(())
    }

    async fn load(&self, slot_name: &str) -> Result<Option<Lsn>> {
        Ok(self.positions.lock().unwrap().get(slot_name).copied())
    }

    async fn save_resolved_name(&self, database_id: &str, kind: &str, name: &str) -> Result<()> {
        self.resolved_names
            .lock()
            .unwrap()
            .insert((database_id.to_string(), kind.to_string()), name.to_string());
        Ok(())
    }

    async fn load_resolved_name(&self, database_id: &str, kind: &str) -> Result<Option<String>> {
        Ok(self
            .resolved_names
            .lock()
            .unwrap()
            .get(&(database_id.to_string(), kind.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemoryCheckpointStore::new();
        store.save("slot_a", Lsn::from(42)).await.unwrap();
        assert_eq!(store.load("slot_a").await.unwrap(), Some(Lsn::from(42)));
    }

    #[tokio::test]
    async fn test_load_missing_slot() {
        let store = InMemoryCheckpointStore::new();
        assert_eq!(store.load("unknown").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolved_name_persists_across_loads() {
        let store = InMemoryCheckpointStore::new();
        assert_eq!(store.load_resolved_name("acme", "slot").await.unwrap(), None);
        store.save_resolved_name("acme", "slot", "cdc_slot_acme_7f3a").await.unwrap();
        assert_eq!(
            store.load_resolved_name("acme", "slot").await.unwrap(),
            Some("cdc_slot_acme_7f3a".to_string())
        );
        assert_eq!(store.load_resolved_name("acme", "publication").await.unwrap(), None);
    }
}
