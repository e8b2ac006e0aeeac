//! Per-column transformation pipeline applied to a decoded row before it is
//! handed to the event callback (§4.I).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::{ColumnValue, RowMap};

/// A single column-rewrite rule. Rules are applied in declaration order;
/// later rules see the output of earlier ones. `target` names the output
/// column and is independent of `kind`: it defaults to `column` (in place
/// rewrite) but can rename the column on any rule kind, not just a rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationRule {
    pub column: String,
    /// Output column name. Defaults to `column` when omitted.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(flatten)]
    pub kind: RuleKind,
}

impl TransformationRule {
    /// The column this rule's result is written under.
    fn output_key(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.column)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// Pass the value through unchanged.
    Direct,
    /// ASCII-uppercase a text value; non-text values pass through unchanged.
    Upper,
    /// ASCII-lowercase a text value; non-text values pass through unchanged.
    Lower,
    /// Replace a null/unchanged-toast value with a fixed literal.
    Default { value: String },
    /// Hand the value to a named remote function for rewriting. If the
    /// service call fails, the column is passed through unchanged and a
    /// warning is returned to the caller.
    Remote { function: String },
}

/// Out-of-process value rewriter invoked by [`RuleKind::Remote`] rules.
#[async_trait]
pub trait TransformService: Send + Sync {
    async fn invoke(&self, function: &str, column: &str, value: &ColumnValue) -> Result<ColumnValue>;
}

/// Calls a configured HTTP endpoint: `POST {base_url}/{function}` with
/// `{"column": ..., "value": ...}`, expecting `{"value": ...}` back.
pub struct HttpTransformService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransformService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct RemoteRequest<'a> {
    column: &'a str,
    value: Option<&'a str>,
}

#[derive(Deserialize)]
struct RemoteResponse {
    value: Option<String>,
}

#[async_trait]
impl TransformService for HttpTransformService {
    async fn invoke(&self, function: &str, column: &str, value: &ColumnValue) -> Result<ColumnValue> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), function);
        let body = RemoteRequest {
            column,
            value: value.as_text(),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::TransformFailed(format!("remote call to {function} failed: {e}")))?;

        let parsed: RemoteResponse = response
            .json()
            .await
            .map_err(|e| Error::TransformFailed(format!("invalid response from {function}: {e}")))?;

        Ok(match parsed.value {
            Some(v) => ColumnValue::Text(v),
            None => ColumnValue::Null,
        })
    }
}

/// In-memory stand-in for tests: returns whatever mapping was registered for
/// a given function name, or the value unchanged.
#[derive(Default)]
pub struct FakeTransformService {
    responses: HashMap<String, ColumnValue>,
}

impl FakeTransformService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, function: impl Into<String>, value: ColumnValue) -> Self {
        self.responses.insert(function.into(), value);
        self
    }
}

#[async_trait]
impl TransformService for FakeTransformService {
    async fn invoke(&self, function: &str, _column: &str, value: &ColumnValue) -> Result<ColumnValue> {
        Ok(self.responses.get(function).cloned().unwrap_or_else(|| value.clone()))
    }
}

/// Apply every configured rule to `row`, renaming or rewriting columns as
/// directed. Remote-rule failures are swallowed (value passes through) and
/// surfaced to the caller via the returned warnings list.
pub async fn apply_transform(
    row: RowMap,
    rules: &[TransformationRule],
    service: &dyn TransformService,
) -> (RowMap, Vec<String>) {
    let mut out = row;
    let mut warnings = Vec::new();

    for rule in rules {
        let Some(current) = out.remove(&rule.column) else {
            continue;
        };

        let key = rule.output_key().to_string();
        let value = match &rule.kind {
            RuleKind::Direct => current,
            RuleKind::Upper => map_text(current, |s| s.to_uppercase()),
            RuleKind::Lower => map_text(current, |s| s.to_lowercase()),
            RuleKind::Default { value } => match &current {
                ColumnValue::Null | ColumnValue::UnchangedToast => ColumnValue::Text(value.clone()),
                other => other.clone(),
            },
            RuleKind::Remote { function } => match service.invoke(function, &rule.column, &current).await {
                Ok(v) => v,
                Err(e) => {
                    warnings.push(format!("transform {function} on {}: {e}", rule.column));
                    current
                }
            },
        };

        out.insert(key, value);
    }

    (out, warnings)
}

fn map_text(value: ColumnValue, f: impl FnOnce(&str) -> String) -> ColumnValue {
    match value {
        ColumnValue::Text(s) => ColumnValue::Text(f(&s)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with(column: &str, value: ColumnValue) -> RowMap {
        let mut row = RowMap::new();
        row.insert(column.to_string(), value);
        row
    }

    #[tokio::test]
    async fn test_upper_rule() {
        let rules = vec![TransformationRule {
            column: "name".into(),
            target: None,
            kind: RuleKind::Upper,
        }];
        let row = row_with("name", ColumnValue::Text("alice".into()));
        let service = FakeTransformService::new();
        let (out, warnings) = apply_transform(row, &rules, &service).await;
        assert_eq!(out.get("name").unwrap().as_text(), Some("ALICE"));
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn test_default_rule_only_fills_null() {
        let rules = vec![TransformationRule {
            column: "status".into(),
            target: None,
            kind: RuleKind::Default { value: "unknown".into() },
        }];
        let row = row_with("status", ColumnValue::Null);
        let service = FakeTransformService::new();
        let (out, _) = apply_transform(row, &rules, &service).await;
        assert_eq!(out.get("status").unwrap().as_text(), Some("unknown"));
    }

    #[tokio::test]
    async fn test_target_renames_column_independent_of_kind() {
        let rules = vec![TransformationRule {
            column: "old_name".into(),
            target: Some("new_name".into()),
            kind: RuleKind::Direct,
        }];
        let row = row_with("old_name", ColumnValue::Text("x".into()));
        let service = FakeTransformService::new();
        let (out, _) = apply_transform(row, &rules, &service).await;
        assert!(!out.contains_key("old_name"));
        assert_eq!(out.get("new_name").unwrap().as_text(), Some("x"));
    }

    #[tokio::test]
    async fn test_remote_rule_uses_fake_response() {
        let rules = vec![TransformationRule {
            column: "email".into(),
            target: None,
            kind: RuleKind::Remote { function: "hash_email".into() },
        }];
        let row = row_with("email", ColumnValue::Text("a@example.com".into()));
        let service = FakeTransformService::new().with_response("hash_email", ColumnValue::Text("hashed".into()));
        let (out, warnings) = apply_transform(row, &rules, &service).await;
        assert_eq!(out.get("email").unwrap().as_text(), Some("hashed"));
        assert!(warnings.is_empty());
    }

    struct FailingTransformService;

    #[async_trait]
    impl TransformService for FailingTransformService {
        async fn invoke(&self, function: &str, _column: &str, _value: &ColumnValue) -> Result<ColumnValue> {
            Err(Error::TransformFailed(format!("{function} unreachable")))
        }
    }

    #[tokio::test]
    async fn test_remote_rule_failure_passes_through_to_target_column() {
        let rules = vec![TransformationRule {
            column: "x".into(),
            target: Some("y".into()),
            kind: RuleKind::Remote { function: "reverse".into() },
        }];
        let row = row_with("x", ColumnValue::Text("abc".into()));
        let service = FailingTransformService;
        let (out, warnings) = apply_transform(row, &rules, &service).await;
        assert!(!out.contains_key("x"));
        assert_eq!(out.get("y").unwrap().as_text(), Some("abc"));
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_column_is_a_noop() {
        let rules = vec![TransformationRule {
            column: "missing".into(),
            target: None,
            kind: RuleKind::Upper,
        }];
        let row = row_with("present", ColumnValue::Text("x".into()));
        let service = FakeTransformService::new();
        let (out, _) = apply_transform(row, &rules, &service).await;
        assert_eq!(out.len(), 1);
    }
}
