mod error;
mod session;
mod validation;

pub use error::{ConfigError, ConfigResult};
pub use session::{
    CheckpointBackend, CheckpointConfig, ConnectionConfig, SessionConfig, TlsConfig, TlsModeConfig,
};
pub use validation::to_replication_config;
