//! Entity stores
//!
//! [`EntityStore`] is the single choke point for persistence. Every mutating
//! operation is atomic: it is either fully applied or rolled back, and no
//! reader ever observes an intermediate state.
//!
//! Two backends implement it:
//!
//! - [`SqlStore`]: SQLite through `sqlx`, one transaction per mutation
//! - [`MemoryStore`]: per-kind tables in process memory behind an `RwLock`
//!
//! # Removal policy
//!
//! [`EntityStore::remove`] is idempotent. Removing an id that does not exist
//! succeeds and reports `false`; callers that need presence (the HTTP layer)
//! turn that into a not-found response themselves.

pub mod memory;
pub mod sql;

pub use memory::MemoryStore;
pub use sql::SqlStore;

use async_trait::async_trait;
use roster_common::ValidationError;
use thiserror::Error;

use crate::entity::{EntityId, EntitySchema, Record};
use crate::query::{QueryBuilder, QueryDescriptor};

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Record failed schema or entity validation; never retried
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A mutating operation could not be committed and was rolled back in full
    #[error("Transaction on {kind} failed and was rolled back: {source}")]
    TransactionFailure {
        kind: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Read or connection failure outside of a transaction
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed at startup
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row no longer matches its schema
    #[error("Stored {kind} record could not be decoded: {message}")]
    Decode { kind: &'static str, message: String },

    /// Every id of a kind has been handed out
    #[error("No ids left for {kind}")]
    IdsExhausted { kind: &'static str },

    /// A query descriptor was passed to an operation it does not fit
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl StoreError {
    pub fn transaction(kind: &'static str, source: sqlx::Error) -> Self {
        Self::TransactionFailure { kind, source }
    }

    pub fn decode(kind: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            kind,
            message: err.to_string(),
        }
    }
}

/// Backend-agnostic transactional persistence
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Short backend name for logs and health reporting
    fn backend(&self) -> &'static str;

    /// Insert a new record and return its freshly assigned id.
    ///
    /// Any id already on the record is ignored.
    async fn persist(&self, record: Record) -> StoreResult<EntityId>;

    /// Look up one record; absence is `Ok(None)`
    async fn find(&self, schema: &'static EntitySchema, id: EntityId)
        -> StoreResult<Option<Record>>;

    /// Records matching a select descriptor, ordered by id
    async fn find_where(&self, query: &QueryDescriptor) -> StoreResult<Vec<Record>>;

    /// Snapshot of every committed record of one kind, ordered by id
    async fn find_all(&self, schema: &'static EntitySchema) -> StoreResult<Vec<Record>> {
        self.find_where(&QueryBuilder::select_all(schema)).await
    }

    /// Update the record with the same id, or insert it under a new id when
    /// no such record exists. Returns the record as stored.
    async fn merge(&self, record: Record) -> StoreResult<Record>;

    /// Overwrite the record with the same id. Returns `None`, and writes
    /// nothing, when no such record exists.
    async fn update(&self, record: Record) -> StoreResult<Option<Record>>;

    /// Remove one record. Idempotent: returns `false` when it was already absent.
    async fn remove(&self, schema: &'static EntitySchema, id: EntityId) -> StoreResult<bool>;

    /// Remove every record matching a delete descriptor; returns rows affected
    async fn remove_where(&self, query: &QueryDescriptor) -> StoreResult<u64>;

    async fn count(&self, schema: &'static EntitySchema) -> StoreResult<u64>;

    /// Verify the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}
