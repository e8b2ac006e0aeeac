use cdc_core::TlsMode;

use crate::error::{ConfigError, ConfigResult};
use crate::session::{CheckpointBackend, SessionConfig, TlsModeConfig};

/// Validate a session configuration and convert it into a `ReplicationConfig`
/// ready to hand to a `cdc_pg::ReplicationSession`.
pub fn to_replication_config(config: &SessionConfig) -> ConfigResult<cdc_core::ReplicationConfig> {
    validate_session(config)?;

    let tls_mode = resolve_tls_mode(config);
    let connection_string = build_connection_string(config, tls_mode);

    Ok(cdc_core::ReplicationConfig {
        connection_string,
        tls_mode,
        database_id: config.database_id.clone(),
        tables: config.table_names.clone(),
        transformation_rules: config.transformation_rules.clone(),
        slot_name_override: config.slot_name.clone(),
        publication_name_override: config.publication_name.clone(),
        transform_service_url: config.transform_service_url.clone(),
        replica_identity_full: config.replica_identity_full,
    })
}

fn validate_session(config: &SessionConfig) -> ConfigResult<()> {
    if config.database_id.trim().is_empty() {
        return Err(ConfigError::MissingField { field: "database_id".into() });
    }
    if config.table_names.is_empty() {
        return Err(ConfigError::NoTablesConfigured);
    }
    if config.checkpoint.backend == CheckpointBackend::Postgres && config.checkpoint.table.is_none() {
        return Err(ConfigError::MissingField { field: "checkpoint.table".into() });
    }
    Ok(())
}

fn resolve_tls_mode(config: &SessionConfig) -> TlsMode {
    if !config.tls.ssl {
        return TlsMode::Disable;
    }

    match config.tls.mode {
        Some(TlsModeConfig::Disable) => TlsMode::Disable,
        Some(TlsModeConfig::Prefer) | None => TlsMode::Prefer,
        Some(TlsModeConfig::Require) => TlsMode::Require,
        Some(TlsModeConfig::VerifyCa) => TlsMode::VerifyCa,
        Some(TlsModeConfig::VerifyFull) => TlsMode::VerifyFull,
    }
}

fn build_connection_string(config: &SessionConfig, tls_mode: TlsMode) -> String {
    let conn = &config.connection;
    let sslmode = match tls_mode {
        TlsMode::Disable => "disable",
        TlsMode::Prefer => "prefer",
        TlsMode::Require => "require",
        TlsMode::VerifyCa => "verify-ca",
        TlsMode::VerifyFull => "verify-full",
    };

    format!(
        "postgres://{}:{}@{}:{}/{}?sslmode={}",
        percent_encoding::utf8_percent_encode(&conn.username, percent_encoding::NON_ALPHANUMERIC),
        percent_encoding::utf8_percent_encode(&conn.password, percent_encoding::NON_ALPHANUMERIC),
        conn.host,
        conn.port,
        conn.database_name,
        sslmode,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;

    fn parse(toml: &str) -> SessionConfig {
        SessionConfig::parse(toml).unwrap()
    }

    #[test]
    fn test_minimal_session_converts() {
        let config = parse(
            r#"
database_id = "acme"
table_names = ["public.users"]

[connection]
host = "localhost"
username = "cdc"
database_name = "acme_db"
"#,
        );
        let replication_config = to_replication_config(&config).unwrap();
        assert_eq!(replication_config.database_id, "acme");
        assert_eq!(replication_config.tls_mode, TlsMode::Disable);
        assert!(replication_config.connection_string.contains("localhost:5432"));
    }

    #[test]
    fn test_ssl_without_mode_defaults_to_prefer() {
        let config = parse(
            r#"
database_id = "acme"
table_names = ["public.users"]

[connection]
host = "localhost"
username = "cdc"
database_name = "acme_db"

[tls]
ssl = true
"#,
        );
        let replication_config = to_replication_config(&config).unwrap();
        assert_eq!(replication_config.tls_mode, TlsMode::Prefer);
    }

    #[test]
    fn test_no_tables_rejected() {
        let config = parse(
            r#"
database_id = "acme"
table_names = []

[connection]
host = "localhost"
username = "cdc"
database_name = "acme_db"
"#,
        );
        assert!(matches!(to_replication_config(&config), Err(ConfigError::NoTablesConfigured)));
    }

    #[test]
    fn test_postgres_checkpoint_without_table_rejected() {
        let config = parse(
            r#"
database_id = "acme"
table_names = ["public.users"]

[connection]
host = "localhost"
username = "cdc"
database_name = "acme_db"

[checkpoint]
backend = "postgres"
"#,
        );
        assert!(matches!(to_replication_config(&config), Err(ConfigError::MissingField { .. })));
    }
}
