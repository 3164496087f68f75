//! Typed in-memory repository
//!
//! [`InMemoryCollection`] keeps entities of a single kind in insertion order
//! behind an [`RwLock`]. Each mutation completes under one write guard with
//! no await point inside it, so readers see the collection either before or
//! after a change.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::entity::{Entity, EntityId, FieldValue};
use crate::query::QueryBuilder;
use crate::repository::Repository;
use crate::store::{StoreError, StoreResult};

struct Items<T> {
    entries: Vec<T>,
    last_id: Option<EntityId>,
}

impl<T: Entity> Items<T> {
    fn allocate(&mut self) -> StoreResult<EntityId> {
        let id = match self.last_id {
            None => EntityId::FIRST,
            Some(last) => last.next().ok_or(StoreError::IdsExhausted {
                kind: T::schema().kind,
            })?,
        };
        self.last_id = Some(id);
        Ok(id)
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == Some(id))
    }
}

/// [`Repository`] over an ordered `Vec<T>`
pub struct InMemoryCollection<T> {
    items: RwLock<Items<T>>,
}

impl<T: Entity> InMemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Items {
                entries: Vec::new(),
                last_id: None,
            }),
        }
    }
}

impl<T: Entity> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryCollection<T> {
    fn backend(&self) -> &'static str {
        "collection"
    }

    #[tracing::instrument(skip(self, entity), fields(kind = T::schema().kind, id = ?entity.id()))]
    async fn save(&self, mut entity: T) -> StoreResult<T> {
        entity.validate()?;
        T::schema().validate_record(&entity.to_record())?;

        let mut items = self.items.write().await;
        match entity.id().and_then(|id| items.position(id)) {
            Some(pos) => items.entries[pos] = entity.clone(),
            None => {
                let id = items.allocate()?;
                entity.set_id(id);
                items.entries.push(entity.clone());
                tracing::debug!(%id, "Entity added to collection");
            },
        }

        Ok(entity)
    }

    #[tracing::instrument(skip(self, entity), fields(kind = T::schema().kind, id = ?entity.id()))]
    async fn update(&self, entity: T) -> StoreResult<Option<T>> {
        entity.validate()?;
        T::schema().validate_record(&entity.to_record())?;
        let Some(id) = entity.id() else {
            return Ok(None);
        };

        let mut items = self.items.write().await;
        Ok(items.position(id).map(|pos| {
            items.entries[pos] = entity.clone();
            entity
        }))
    }

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<T>> {
        let items = self.items.read().await;
        Ok(items.position(id).map(|pos| items.entries[pos].clone()))
    }

    async fn find_all(&self) -> StoreResult<Vec<T>> {
        Ok(self.items.read().await.entries.clone())
    }

    async fn delete_by_id(&self, id: EntityId) -> StoreResult<bool> {
        let mut items = self.items.write().await;
        Ok(match items.position(id) {
            Some(pos) => {
                items.entries.remove(pos);
                true
            },
            None => false,
        })
    }

    #[tracing::instrument(skip(self, value), fields(kind = T::schema().kind))]
    async fn delete_where(&self, field: &str, value: FieldValue) -> StoreResult<u64> {
        let query = QueryBuilder::delete_where_equals(T::schema(), field, value)?;

        let mut items = self.items.write().await;
        let before = items.entries.len();
        items.entries.retain(|entity| !query.matches(&entity.to_record()));
        let removed = (before - items.entries.len()) as u64;

        tracing::debug!(removed, "Bulk delete applied");
        Ok(removed)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.items.read().await.entries.len() as u64)
    }
}
