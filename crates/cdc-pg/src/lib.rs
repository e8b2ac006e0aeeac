pub mod apply;
pub mod checkpoint_store;
pub mod connect;
pub mod error;
pub mod pgoutput;
pub mod prerequisites;
pub mod publication;
pub mod session;
pub mod slot;

pub use apply::apply_event;
pub use checkpoint_store::PostgresCheckpointStore;
pub use connect::connect_postgres;
pub use error::{ReplicationError, ReplicationResult};
pub use pgoutput::{PgOutputDecoder, PgOutputMessage};
pub use session::{ReplicationSession, SessionState};
