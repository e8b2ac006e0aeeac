pub mod checkpoint;
pub mod config;
pub mod error;
pub mod event;
pub mod ident;
pub mod lsn;
pub mod relation;
pub mod secret;
pub mod transform;
pub mod value;

pub use checkpoint::{CheckpointStore, InMemoryCheckpointStore};
pub use config::{ReplicationConfig, TlsMode};
pub use error::{Error, Result};
pub use event::{CDCEvent, Operation};
pub use lsn::Lsn;
pub use relation::{ColumnDescriptor, RelationCache, RelationMetadata};
pub use secret::{EnvSecretProvider, PlaintextSecretProvider, SecretProvider};
pub use transform::{
    apply_transform, FakeTransformService, HttpTransformService, RuleKind, TransformService,
    TransformationRule,
};
pub use value::{ColumnValue, RowMap};
