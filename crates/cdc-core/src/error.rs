use thiserror::Error;

/// Errors that can occur while building or validating a session's configuration
/// or running the transformation pipeline, independent of any database driver.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("transform failed: {0}")]
    TransformFailed(String),

    #[error("checkpoint store failed: {0}")]
    CheckpointFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
