//! The normalized change record handed to the consumer callback.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::value::RowMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    Truncate,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Truncate => "TRUNCATE",
        }
    }
}

/// A normalized row-level change event derived from the replication stream.
#[derive(Debug, Clone)]
pub struct CDCEvent {
    pub op: Operation,
    pub schema: Option<String>,
    pub table: String,
    pub new: Option<RowMap>,
    pub old: Option<RowMap>,
    /// Canonical `hi/lo` text form (§3 LSN).
    pub lsn: String,
    /// Server commit time when available, else the time the event was
    /// received by the wire-frame reader.
    pub timestamp: String,
    pub metadata: HashMap<String, String>,
}

impl CDCEvent {
    /// Enforces the §3 CDCEvent invariant.
    pub fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(Error::ConfigInvalid("event table name is empty".into()));
        }

        match self.op {
            Operation::Insert => {
                if self.new.as_ref().map_or(true, |m| m.is_empty()) {
                    return Err(Error::ConfigInvalid(
                        "insert event requires non-empty new-values".into(),
                    ));
                }
            }
            Operation::Update => {
                if self.new.as_ref().map_or(true, |m| m.is_empty()) {
                    return Err(Error::ConfigInvalid(
                        "update event requires non-empty new-values".into(),
                    ));
                }
            }
            Operation::Delete => {
                let has_old = self.old.as_ref().map_or(false, |m| !m.is_empty());
                let has_new = self.new.as_ref().map_or(false, |m| !m.is_empty());
                if !has_old && !has_new {
                    return Err(Error::ConfigInvalid(
                        "delete event requires old-values or new-values".into(),
                    ));
                }
            }
            Operation::Truncate => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_event(op: Operation) -> CDCEvent {
        CDCEvent {
            op,
            schema: Some("public".into()),
            table: "users".into(),
            new: None,
            old: None,
            lsn: "0/0".into(),
            timestamp: "1970-01-01T00:00:00Z".into(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_insert_requires_new_values() {
        let mut event = base_event(Operation::Insert);
        assert!(event.validate().is_err());
        event.new = Some(RowMap::new());
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_delete_accepts_old_or_new() {
        let mut event = base_event(Operation::Delete);
        assert!(event.validate().is_err());
        let mut old = RowMap::new();
        old.insert("id".into(), crate::value::ColumnValue::Text("1".into()));
        event.old = Some(old);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_truncate_requires_no_row_data() {
        let event = base_event(Operation::Truncate);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_empty_table_name_rejected() {
        let mut event = base_event(Operation::Truncate);
        event.table = String::new();
        assert!(event.validate().is_err());
    }
}
