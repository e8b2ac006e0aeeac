//! The on-disk/CLI-facing session configuration (§3.1 SessionConfig),
//! parsed from TOML and validated into a `cdc_core::ReplicationConfig`.

use serde::Deserialize;

use cdc_core::TransformationRule;

use crate::error::ConfigResult;

/// Raw session configuration as parsed from TOML.
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Connection coordinates.
    pub connection: ConnectionConfig,
    /// TLS options.
    #[serde(default)]
    pub tls: TlsConfig,
    /// Stable identifier for this consumer; prefixes generated slot/publication names.
    pub database_id: String,
    /// Tables to publish, as `schema.table` strings.
    pub table_names: Vec<String>,
    /// Pre-chosen slot name, bypassing derivation from `database_id`.
    pub slot_name: Option<String>,
    /// Pre-chosen publication name, bypassing derivation from `database_id`.
    pub publication_name: Option<String>,
    /// Where session position is persisted between restarts.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Per-column rewrite rules applied before the event callback.
    #[serde(default)]
    pub transformation_rules: Vec<TransformationRule>,
    /// Base URL of the out-of-process transformation service backing any
    /// `remote` rule above.
    pub transform_service_url: Option<String>,
    /// Whether to set `REPLICA IDENTITY FULL` on every published table
    /// during provisioning.
    #[serde(default = "default_true")]
    pub replica_identity_full: bool,
}

fn default_true() -> bool {
    true
}

impl SessionConfig {
    /// Parse a session config from a TOML string.
    pub fn parse(toml_str: &str) -> ConfigResult<Self> {
        let config: SessionConfig = toml::from_str(toml_str)?;
        Ok(config)
    }
}

/// Connection coordinates.
#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database_name: String,
}

fn default_port() -> u16 {
    5432
}

/// TLS configuration.
#[derive(Debug, Default, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub ssl: bool,
    pub mode: Option<TlsModeConfig>,
    pub cert: Option<String>,
    pub key: Option<String>,
    pub root_cert: Option<String>,
}

/// TLS mode, as parsed from TOML (mirrors `cdc_core::TlsMode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TlsModeConfig {
    Disable,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

/// Where the session persists its last-processed LSN.
#[derive(Debug, Default, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub backend: CheckpointBackend,
    /// Table used when `backend = "postgres"`.
    pub table: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    #[default]
    Memory,
    Postgres,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_session() {
        let toml = r#"
database_id = "acme"
table_names = ["public.users"]

[connection]
host = "localhost"
username = "cdc"
database_name = "acme_db"
"#;
        let config = SessionConfig::parse(toml).unwrap();
        assert_eq!(config.database_id, "acme");
        assert_eq!(config.connection.port, 5432);
        assert_eq!(config.table_names, vec!["public.users".to_string()]);
        assert_eq!(config.checkpoint.backend, CheckpointBackend::Memory);
    }

    #[test]
    fn test_parse_full_session() {
        let toml = r#"
database_id = "acme"
table_names = ["public.users", "public.orders"]
slot_name = "custom_slot"
publication_name = "custom_pub"

[connection]
host = "db.internal"
port = 6543
username = "cdc"
password = "secret"
database_name = "acme_db"

[tls]
ssl = true
mode = "verify-full"
root_cert = "/etc/ssl/ca.pem"

[checkpoint]
backend = "postgres"
table = "cdc_checkpoints"

[[transformation_rules]]
column = "email"
kind = "upper"
"#;
        let config = SessionConfig::parse(toml).unwrap();
        assert_eq!(config.connection.port, 6543);
        assert_eq!(config.slot_name, Some("custom_slot".to_string()));
        assert_eq!(config.checkpoint.backend, CheckpointBackend::Postgres);
        assert_eq!(config.transformation_rules.len(), 1);
        assert!(config.tls.ssl);
    }
}
