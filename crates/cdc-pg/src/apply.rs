//! Applies a normalized change event to a target Postgres table via
//! parameterized INSERT/UPDATE/DELETE/TRUNCATE (§4.J).

use tokio_postgres::types::ToSql;
use tokio_postgres::Client;
use tracing::warn;

use cdc_core::ident::{quote, quote_qualified};
use cdc_core::{CDCEvent, ColumnValue, Operation, RowMap};

use crate::error::{ReplicationError, ReplicationResult};

/// Apply a single event to `client`. The event's own `schema`/`table` select
/// the target; callers that need to route to a differently-named table
/// should remap `event.table` before calling this.
pub async fn apply_event(client: &Client, event: &CDCEvent) -> ReplicationResult<()> {
    let qualified = match &event.schema {
        Some(schema) => format!("{schema}.{}", event.table),
        None => event.table.clone(),
    };
    let target = quote_qualified(&qualified);

    match event.op {
        Operation::Insert => apply_insert(client, &target, event).await,
        Operation::Update => apply_update(client, &target, event).await,
        Operation::Delete => apply_delete(client, &target, event).await,
        Operation::Truncate => apply_truncate(client, &target).await,
    }
}

/// Columns carrying session bookkeeping, never written to the target table.
fn is_data_column(event: &CDCEvent, column: &str) -> bool {
    !event.metadata.contains_key(column)
}

async fn apply_insert(client: &Client, target: &str, event: &CDCEvent) -> ReplicationResult<()> {
    let row = event
        .new
        .as_ref()
        .ok_or_else(|| ReplicationError::ApplyRejected("insert event missing new-values".into()))?;

    let columns: Vec<&str> =
        row.keys().filter(|c| is_data_column(event, c.as_str())).map(String::as_str).collect();
    if columns.is_empty() {
        return Err(ReplicationError::ApplyRejected("insert event has no data columns".into()));
    }

    let column_list = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
    let placeholders = (1..=columns.len()).map(|i| format!("${i}")).collect::<Vec<_>>().join(", ");

    let sql = format!("INSERT INTO {target} ({column_list}) VALUES ({placeholders})");
    let params: Vec<&(dyn ToSql + Sync)> = columns.iter().map(|c| sql_param(&row[*c])).collect();

    client
        .execute(&sql, &params)
        .await
        .map_err(|e| ReplicationError::ApplyRejected(e.to_string()))?;

    Ok(())
}

async fn apply_update(client: &Client, target: &str, event: &CDCEvent) -> ReplicationResult<()> {
    let row = event
        .new
        .as_ref()
        .ok_or_else(|| ReplicationError::ApplyRejected("update event missing new-values".into()))?;

    let columns: Vec<&str> =
        row.keys().filter(|c| is_data_column(event, c.as_str())).map(String::as_str).collect();
    if columns.is_empty() {
        return Err(ReplicationError::ApplyRejected("update event has no data columns".into()));
    }

    let set_clause = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", quote(c), i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    let mut params: Vec<&(dyn ToSql + Sync)> = columns.iter().map(|c| sql_param(&row[*c])).collect();

    // Falls back to matching every row when no key data is available; not a
    // hard error for UPDATE, unlike DELETE below.
    let where_clause = build_where_clause(event, &mut params, columns.len())
        .unwrap_or_else(|| {
            warn!(table = %event.table, "event carries no usable key data, matching all rows");
            "1=1".to_string()
        });

    let sql = format!("UPDATE {target} SET {set_clause} WHERE {where_clause}");

    client
        .execute(&sql, &params)
        .await
        .map_err(|e| ReplicationError::ApplyRejected(e.to_string()))?;

    Ok(())
}

async fn apply_delete(client: &Client, target: &str, event: &CDCEvent) -> ReplicationResult<()> {
    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
    let where_clause = build_where_clause(event, &mut params, 0)
        .ok_or_else(|| ReplicationError::ApplyRejected("delete event has no usable key data".into()))?;

    let sql = format!("DELETE FROM {target} WHERE {where_clause}");

    client
        .execute(&sql, &params)
        .await
        .map_err(|e| ReplicationError::ApplyRejected(e.to_string()))?;

    Ok(())
}

async fn apply_truncate(client: &Client, target: &str) -> ReplicationResult<()> {
    client
        .execute(&format!("TRUNCATE TABLE {target}"), &[])
        .await
        .map_err(|e| ReplicationError::ApplyRejected(e.to_string()))?;

    Ok(())
}

/// Build a `WHERE` clause identifying the affected row from an event's old
/// values (falling back to new values). Parameters are appended to `params`
/// starting at `$(offset+1)`. Null-valued key columns compile to `IS NULL`
/// rather than a bound parameter, since `col = NULL` never matches in SQL.
///
/// Returns `None` when no usable key data exists at all; callers decide
/// whether that is a hard error (DELETE) or a logged `1=1` fallback (UPDATE).
fn build_where_clause<'a>(
    event: &'a CDCEvent,
    params: &mut Vec<&'a (dyn ToSql + Sync)>,
    offset: usize,
) -> Option<String> {
    let row = preferred_key_row(event)?;
    if row.is_empty() {
        return None;
    }

    let mut clauses = Vec::with_capacity(row.len());
    for (column, value) in row.iter().filter(|(c, _)| is_data_column(event, c.as_str())) {
        match value {
            ColumnValue::Null => clauses.push(format!("{} IS NULL", quote(column))),
            ColumnValue::UnchangedToast => continue,
            _ => {
                clauses.push(format!("{} = ${}", quote(column), offset + params.len() + 1));
                params.push(sql_param(value));
            }
        }
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

fn preferred_key_row(event: &CDCEvent) -> Option<&RowMap> {
    event.old.as_ref().or(event.new.as_ref())
}

fn sql_param(value: &ColumnValue) -> &(dyn ToSql + Sync) {
    match value {
        ColumnValue::Text(s) => s,
        ColumnValue::Null | ColumnValue::UnchangedToast => &NULL_PARAM,
        ColumnValue::Binary(b) => b,
    }
}

static NULL_PARAM: Option<String> = None;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn event_with(op: Operation, new: Option<RowMap>, old: Option<RowMap>) -> CDCEvent {
        CDCEvent {
            op,
            schema: Some("public".into()),
            table: "users".into(),
            new,
            old,
            lsn: "0/0".into(),
            timestamp: "1970-01-01T00:00:00Z".into(),
            metadata: HashMap::new(),
        }
    }

    fn row(pairs: &[(&str, &str)]) -> RowMap {
        pairs.iter().map(|(k, v)| (k.to_string(), ColumnValue::Text(v.to_string()))).collect()
    }

    #[test]
    fn test_where_clause_prefers_old_row() {
        let event = event_with(Operation::Update, Some(row(&[("name", "bob")])), Some(row(&[("id", "1")])));
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        let clause = build_where_clause(&event, &mut params, 0);
        assert_eq!(clause, Some("\"id\" = $1".to_string()));
    }

    #[test]
    fn test_where_clause_none_when_no_key_data() {
        let event = event_with(Operation::Delete, None, None);
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        let clause = build_where_clause(&event, &mut params, 0);
        assert_eq!(clause, None);
        assert!(params.is_empty());
    }

    #[test]
    fn test_where_clause_null_key_uses_is_null() {
        let mut old = RowMap::new();
        old.insert("id".to_string(), ColumnValue::Null);
        let event = event_with(Operation::Delete, None, Some(old));
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        let clause = build_where_clause(&event, &mut params, 0);
        assert_eq!(clause, Some("\"id\" IS NULL".to_string()));
        assert!(params.is_empty());
    }

    #[test]
    fn test_where_clause_mixes_null_and_bound_columns() {
        let mut old = RowMap::new();
        old.insert("id".to_string(), ColumnValue::Text("1".into()));
        old.insert("deleted_at".to_string(), ColumnValue::Null);
        let event = event_with(Operation::Delete, None, Some(old));
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        let clause = build_where_clause(&event, &mut params, 0).unwrap();
        assert!(clause.contains("\"id\" = $1"));
        assert!(clause.contains("\"deleted_at\" IS NULL"));
        assert_eq!(params.len(), 1);
    }
}
