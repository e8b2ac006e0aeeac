//! Resolves connection credentials from wherever the host application keeps
//! them, so the replication session never needs to know about a secrets
//! backend (§6.1 ambient interfaces).

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Resolve `key` (e.g. a connection-string env var name) to its value.
    async fn resolve(&self, key: &str) -> Result<String>;
}

/// Looks keys up directly in the process environment.
pub struct EnvSecretProvider;

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn resolve(&self, key: &str) -> Result<String> {
        std::env::var(key).map_err(|_| crate::error::Error::ConfigInvalid(format!("missing env var {key}")))
    }
}

/// Returns the key itself as the value, for callers that already resolved
/// secrets before constructing the session config.
pub struct PlaintextSecretProvider;

#[async_trait]
impl SecretProvider for PlaintextSecretProvider {
    async fn resolve(&self, key: &str) -> Result<String> {
        Ok(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plaintext_passthrough() {
        let provider = PlaintextSecretProvider;
        assert_eq!(provider.resolve("postgres://x").await.unwrap(), "postgres://x");
    }

    #[tokio::test]
    async fn test_env_missing_key_errors() {
        let provider = EnvSecretProvider;
        assert!(provider.resolve("CDC_DEFINITELY_UNSET_VAR").await.is_err());
    }
}
