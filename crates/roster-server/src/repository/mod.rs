//! Typed repositories
//!
//! [`Repository<T>`] is the only persistence surface the HTTP layer sees. It
//! is object safe, so handlers hold an `Arc<dyn Repository<T>>` and stay
//! unaware of which backend sits underneath.

mod store;

pub use store::StoreRepository;

use async_trait::async_trait;

use crate::entity::{Entity, EntityId, FieldValue};
use crate::store::StoreResult;

/// Generic CRUD over one entity kind
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Backend name, reported by the health endpoint
    fn backend(&self) -> &'static str;

    /// Create the entity when it has no id, otherwise update it.
    ///
    /// Returns the entity as stored, id included.
    async fn save(&self, entity: T) -> StoreResult<T>;

    /// Replace an existing entity in one atomic step. Returns `None` when
    /// the entity has no id or nothing with that id exists; nothing is
    /// created in that case.
    async fn update(&self, entity: T) -> StoreResult<Option<T>>;

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<T>>;

    /// All entities of this kind, ordered by id
    async fn find_all(&self) -> StoreResult<Vec<T>>;

    /// Returns `false` when nothing with that id existed
    async fn delete_by_id(&self, id: EntityId) -> StoreResult<bool>;

    /// Delete every entity whose `field` equals `value`; returns how many went
    async fn delete_where(&self, field: &str, value: FieldValue) -> StoreResult<u64>;

    async fn count(&self) -> StoreResult<u64>;

    async fn exists(&self, id: EntityId) -> StoreResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// Verify the backing storage is reachable
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
