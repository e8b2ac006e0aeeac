//! Cache mapping a server-assigned relation id to its schema/columns.
//!
//! The decoder is the sole writer; any status reporter may read concurrently,
//! so access is serialized by a reader/writer lock (§3 RelationMetadata).

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub type_oid: u32,
    pub type_modifier: i32,
    /// True if this column is part of the relation's key.
    pub is_key: bool,
}

#[derive(Debug, Clone)]
pub struct RelationMetadata {
    pub relation_id: u32,
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

/// Relation id -> metadata cache. Never evicted during a session; replaced
/// atomically if the server re-emits a Relation message for the same id.
#[derive(Debug, Default)]
pub struct RelationCache {
    inner: RwLock<HashMap<u32, RelationMetadata>>,
}

impl RelationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, metadata: RelationMetadata) {
        self.inner.write().unwrap().insert(metadata.relation_id, metadata);
    }

    pub fn get(&self, relation_id: u32) -> Option<RelationMetadata> {
        self.inner.read().unwrap().get(&relation_id).cloned()
    }

    pub fn clear(&self) {
        self.inner.write().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(relation_id: u32) -> RelationMetadata {
        RelationMetadata {
            relation_id,
            schema: "public".into(),
            name: "users".into(),
            columns: vec![ColumnDescriptor {
                name: "id".into(),
                type_oid: 23,
                type_modifier: -1,
                is_key: true,
            }],
        }
    }

    #[test]
    fn test_update_and_get() {
        let cache = RelationCache::new();
        cache.update(sample(16384));
        let info = cache.get(16384).unwrap();
        assert_eq!(info.name, "users");
        assert_eq!(info.columns.len(), 1);
    }

    #[test]
    fn test_cache_miss() {
        let cache = RelationCache::new();
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn test_replace_is_atomic() {
        let cache = RelationCache::new();
        cache.update(sample(1));
        let mut replacement = sample(1);
        replacement.name = "renamed".into();
        cache.update(replacement);
        assert_eq!(cache.get(1).unwrap().name, "renamed");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = RelationCache::new();
        cache.update(sample(1));
        cache.clear();
        assert!(cache.is_empty());
    }
}
