//! Shared Postgres connection utilities with TLS support.

use std::sync::Arc;

use cdc_core::TlsMode;
use rustls::ClientConfig;
use tokio_postgres::Client;
use tokio_postgres_rustls_improved::MakeRustlsConnect;

use crate::error::{ReplicationError, ReplicationResult};

/// Connect to Postgres honoring the requested TLS mode. Spawns the
/// connection task and returns only the client.
pub async fn connect_postgres(connection_string: &str, tls_mode: TlsMode) -> ReplicationResult<Client> {
    if tls_mode == TlsMode::Disable {
        return connect_plain(connection_string).await;
    }

    let config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| ReplicationError::TlsFailed(format!("TLS config error: {}", e)))?
        .with_root_certificates(root_certs())
        .with_no_client_auth();

    let connector = MakeRustlsConnect::new(config);

    match tokio_postgres::connect(connection_string, connector).await {
        Ok((client, connection)) => {
            spawn_connection(connection);
            Ok(client)
        }
        Err(e) if tls_mode == TlsMode::Prefer => {
            tracing::warn!(error = %e, "TLS connection failed, falling back to plaintext");
            connect_plain(connection_string).await
        }
        Err(e) => Err(ReplicationError::TlsFailed(e.to_string())),
    }
}

async fn connect_plain(connection_string: &str) -> ReplicationResult<Client> {
    let (client, connection) = tokio_postgres::connect(connection_string, tokio_postgres::NoTls)
        .await
        .map_err(|e| ReplicationError::Connection(e.to_string()))?;

    spawn_connection(connection);
    Ok(client)
}

fn spawn_connection<S, T>(connection: tokio_postgres::Connection<S, T>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    T: tokio_postgres::tls::TlsStream + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "Postgres connection error");
        }
    });
}

fn root_certs() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}
