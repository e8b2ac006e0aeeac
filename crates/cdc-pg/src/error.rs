use thiserror::Error;

/// Error taxonomy for the Postgres-facing half of a replication session (§7).
#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("postgres error: {0}")]
    Postgres(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("TLS negotiation failed: {0}")]
    TlsFailed(String),

    #[error("replication slot '{0}' does not exist")]
    SlotNotFound(String),

    #[error("replication slot '{0}' is already in use by another connection")]
    SlotInUse(String),

    #[error("failed to create replication slot: {0}")]
    SlotCreationFailed(String),

    #[error("publication '{0}' does not exist")]
    PublicationNotFound(String),

    #[error("table {schema}.{table} does not exist")]
    TableNotFound { schema: String, table: String },

    #[error("prerequisite not met: {0}")]
    PrerequisiteFailed(String),

    #[error("relation {0} referenced before a Relation message described it")]
    RelationNotFound(u32),

    #[error("malformed pgoutput message: {0}")]
    PgOutput(String),

    #[error("replication stream was interrupted: {0}")]
    StreamInterrupted(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("no data received within the keepalive deadline")]
    DecodeMiss,

    #[error("apply of change rejected by target: {0}")]
    ApplyRejected(String),

    #[error("invalid LSN format: {0}")]
    InvalidLsn(String),

    #[error("operation attempted in an invalid session state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Core(#[from] cdc_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReplicationError {
    /// Whether retrying the session from the same position is likely to
    /// succeed. Transient network/connection failures are retryable;
    /// configuration and protocol-shape errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReplicationError::Connection(_)
                | ReplicationError::StreamInterrupted(_)
                | ReplicationError::DecodeMiss
                | ReplicationError::Postgres(_)
        )
    }
}

impl From<tokio_postgres::Error> for ReplicationError {
    fn from(e: tokio_postgres::Error) -> Self {
        if let Some(db_err) = e.as_db_error() {
            let msg = format!(
                "{}: {} (code: {})",
                db_err.severity(),
                db_err.message(),
                db_err.code().code()
            );
            if db_err.code() == &tokio_postgres::error::SqlState::INVALID_PASSWORD {
                ReplicationError::AuthFailed(msg)
            } else {
                ReplicationError::Postgres(msg)
            }
        } else {
            ReplicationError::Postgres(e.to_string())
        }
    }
}

pub type ReplicationResult<T> = Result<T, ReplicationError>;
