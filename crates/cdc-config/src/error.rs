use thiserror::Error;

/// Errors that can occur when parsing or validating session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("no tables configured; at least one is required")]
    NoTablesConfigured,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
