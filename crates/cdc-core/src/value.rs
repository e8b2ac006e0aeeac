//! A decoded column value, distinguishing "null" from "omitted because TOAST
//! was unchanged" — the ambiguity a plain `Option<String>` can't express.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Text(String),
    Binary(Vec<u8>),
    /// The server omitted this column because it is an out-of-line (TOAST)
    /// value identical to the previous row version. Callers must treat this
    /// as "no information", never as null.
    UnchangedToast,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Ordered so generated SQL column lists are deterministic across runs.
pub type RowMap = BTreeMap<String, ColumnValue>;
