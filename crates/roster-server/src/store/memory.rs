//! In-memory entity store for development and tests
//!
//! Each kind gets its own table: rows kept in id order plus a high-water mark
//! for id allocation. The mark only ever grows, so ids are not reused after
//! deletion. Mutations run entirely under the write guard with no await
//! points, which makes each one atomic with respect to readers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{EntityStore, StoreError, StoreResult};
use crate::entity::{EntityId, EntitySchema, Record};
use crate::query::{QueryDescriptor, QueryOp};

#[derive(Debug, Default)]
struct MemoryTable {
    /// Sorted by id; ids are allocated in increasing order so pushes keep it sorted
    rows: Vec<Record>,
    last_id: Option<EntityId>,
}

impl MemoryTable {
    fn allocate(&mut self, kind: &'static str) -> StoreResult<EntityId> {
        let id = match self.last_id {
            None => EntityId::FIRST,
            Some(last) => last.next().ok_or(StoreError::IdsExhausted { kind })?,
        };
        self.last_id = Some(id);
        Ok(id)
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        self.rows
            .binary_search_by_key(&Some(id), |row| row.id)
            .ok()
    }

    fn insert(&mut self, mut record: Record) -> StoreResult<Record> {
        record.id = Some(self.allocate(record.kind())?);
        self.rows.push(record.clone());
        Ok(record)
    }
}

/// Process-local [`EntityStore`]
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<&'static str, MemoryTable>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    #[tracing::instrument(skip(self, record), fields(kind = record.kind()))]
    async fn persist(&self, record: Record) -> StoreResult<EntityId> {
        record.schema.validate_record(&record)?;

        let mut tables = self.tables.write().await;
        let table = tables.entry(record.schema.kind).or_default();
        let id = table.allocate(record.kind())?;
        table.rows.push(record.with_id(Some(id)));

        tracing::debug!(%id, "Record persisted");
        Ok(id)
    }

    async fn find(
        &self,
        schema: &'static EntitySchema,
        id: EntityId,
    ) -> StoreResult<Option<Record>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(schema.kind)
            .and_then(|table| table.position(id).map(|pos| table.rows[pos].clone())))
    }

    async fn find_where(&self, query: &QueryDescriptor) -> StoreResult<Vec<Record>> {
        if query.op() != QueryOp::Select {
            return Err(StoreError::InvalidQuery(format!(
                "find_where expects a select query, got {:?}",
                query.op()
            )));
        }

        let tables = self.tables.read().await;
        Ok(tables
            .get(query.schema().kind)
            .map(|table| {
                table
                    .rows
                    .iter()
                    .filter(|row| query.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    #[tracing::instrument(skip(self, record), fields(kind = record.kind(), id = ?record.id))]
    async fn merge(&self, record: Record) -> StoreResult<Record> {
        record.schema.validate_record(&record)?;

        let mut tables = self.tables.write().await;
        let table = tables.entry(record.schema.kind).or_default();

        match record.id.and_then(|id| table.position(id)) {
            Some(pos) => {
                table.rows[pos].fields = record.fields.clone();
                Ok(record)
            },
            None => {
                let stored = table.insert(record)?;
                tracing::debug!(id = ?stored.id, "Merge inserted a new record");
                Ok(stored)
            },
        }
    }

    #[tracing::instrument(skip(self, record), fields(kind = record.kind(), id = ?record.id))]
    async fn update(&self, record: Record) -> StoreResult<Option<Record>> {
        record.schema.validate_record(&record)?;
        let Some(id) = record.id else {
            return Ok(None);
        };

        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(record.kind()) else {
            return Ok(None);
        };
        let Some(pos) = table.position(id) else {
            return Ok(None);
        };

        table.rows[pos].fields = record.fields.clone();
        Ok(Some(record))
    }

    #[tracing::instrument(skip(self, schema), fields(kind = schema.kind))]
    async fn remove(&self, schema: &'static EntitySchema, id: EntityId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = match tables.get_mut(schema.kind) {
            Some(table) => match table.position(id) {
                Some(pos) => {
                    table.rows.remove(pos);
                    true
                },
                None => false,
            },
            None => false,
        };

        if !removed {
            tracing::debug!(%id, "Remove of absent record ignored");
        }
        Ok(removed)
    }

    #[tracing::instrument(skip(self, query), fields(kind = query.schema().kind))]
    async fn remove_where(&self, query: &QueryDescriptor) -> StoreResult<u64> {
        if query.op() != QueryOp::Delete {
            return Err(StoreError::InvalidQuery(format!(
                "remove_where expects a delete query, got {:?}",
                query.op()
            )));
        }

        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(query.schema().kind) else {
            return Ok(0);
        };

        let before = table.rows.len();
        table.rows.retain(|row| !query.matches(row));
        let removed = (before - table.rows.len()) as u64;

        tracing::debug!(removed, "Bulk remove applied");
        Ok(removed)
    }

    async fn count(&self, schema: &'static EntitySchema) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.get(schema.kind).map_or(0, |t| t.rows.len() as u64))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
