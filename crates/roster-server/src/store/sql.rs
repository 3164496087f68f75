//! SQLite entity store
//!
//! Every mutation runs in its own transaction that opens with a write, so the
//! connection takes the write lock up front instead of upgrading mid-way.
//! Statements are assembled with [`sqlx::QueryBuilder`]: identifiers come from
//! the static [`EntitySchema`], values are always bound parameters.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{
    Sqlite, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder as SqlBuilder, Row};
use std::str::FromStr;
use std::time::Duration;

use super::{EntityStore, StoreError, StoreResult};
use crate::config::DatabaseConfig;
use crate::entity::{EntityId, EntitySchema, FieldType, FieldValue, Record};
use crate::query::{Predicate, QueryDescriptor, QueryOp};

/// [`EntityStore`] backed by a SQLite connection pool
#[derive(Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    /// Wrap an existing pool. The schema is assumed to be migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database described by `config`, creating the file if needed,
    /// and apply pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(config.connect_timeout_secs));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // An in-memory database lives and dies with its connection
        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
        };

        let pool = pool_options.connect_with(options).await?;

        tracing::info!(
            url = %config.url,
            max_connections = if in_memory { 1 } else { config.max_connections },
            "Database connection pool created"
        );

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn insert(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        record: &Record,
    ) -> Result<EntityId, sqlx::Error> {
        let schema = record.schema;
        let mut builder = SqlBuilder::<Sqlite>::new("INSERT INTO ");
        builder.push(schema.table).push(" (");

        let mut columns = builder.separated(", ");
        for field in schema.fields {
            columns.push(field.column);
        }

        builder.push(") VALUES (");
        for (i, field) in schema.fields.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, record.get(field.name).unwrap_or(&FieldValue::Null));
        }
        builder.push(") RETURNING id");

        let raw: i64 = builder.build_query_scalar().fetch_one(&mut **tx).await?;
        EntityId::new(raw).ok_or_else(|| sqlx::Error::Protocol(format!("non-positive id {raw}")))
    }

    /// Overwrite the row with `id`; `false` when no row has it
    async fn update_row(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        record: &Record,
        id: EntityId,
    ) -> Result<bool, sqlx::Error> {
        let schema = record.schema;
        let mut builder = SqlBuilder::<Sqlite>::new("UPDATE ");
        builder.push(schema.table).push(" SET ");
        for (i, field) in schema.fields.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(field.column).push(" = ");
            push_value(&mut builder, record.get(field.name).unwrap_or(&FieldValue::Null));
        }
        builder.push(" WHERE id = ").push_bind(id.get());

        let result = builder.build().execute(&mut **tx).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn push_value(builder: &mut SqlBuilder<'_, Sqlite>, value: &FieldValue) {
    match value {
        FieldValue::Null => builder.push_bind(None::<String>),
        FieldValue::Integer(n) => builder.push_bind(*n),
        FieldValue::Text(text) => builder.push_bind(text.clone()),
    };
}

fn push_predicate(builder: &mut SqlBuilder<'_, Sqlite>, predicate: Option<&Predicate>) {
    let Some(predicate) = predicate else {
        return;
    };

    builder.push(" WHERE ").push(predicate.field.column);
    if predicate.value.is_null() {
        builder.push(" IS NULL");
    } else {
        builder.push(" = ");
        push_value(builder, &predicate.value);
    }
}

fn decode_row(schema: &'static EntitySchema, row: &SqliteRow) -> StoreResult<Record> {
    let raw: i64 = row.try_get("id")?;
    let id = EntityId::new(raw)
        .ok_or_else(|| StoreError::decode(schema.kind, format!("non-positive id {raw}")))?;

    let mut record = Record::new(schema).with_id(Some(id));
    for field in schema.fields {
        let value = match field.ty {
            FieldType::Text => FieldValue::from(row.try_get::<Option<String>, _>(field.column)?),
            FieldType::Integer => FieldValue::from(row.try_get::<Option<i64>, _>(field.column)?),
        };
        record.fields.insert(field.name.to_string(), value);
    }

    Ok(record)
}

#[async_trait]
impl EntityStore for SqlStore {
    fn backend(&self) -> &'static str {
        "sql"
    }

    #[tracing::instrument(skip(self, record), fields(kind = record.kind()))]
    async fn persist(&self, record: Record) -> StoreResult<EntityId> {
        record.schema.validate_record(&record)?;
        let kind = record.kind();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;
        let id = Self::insert(&mut tx, &record)
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;
        tx.commit()
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;

        tracing::debug!(%id, "Record persisted");
        Ok(id)
    }

    async fn find(
        &self,
        schema: &'static EntitySchema,
        id: EntityId,
    ) -> StoreResult<Option<Record>> {
        let mut builder = SqlBuilder::<Sqlite>::new("SELECT id");
        for field in schema.fields {
            builder.push(", ").push(field.column);
        }
        builder
            .push(" FROM ")
            .push(schema.table)
            .push(" WHERE id = ")
            .push_bind(id.get());

        let row = builder.build().fetch_optional(&self.pool).await?;
        row.map(|row| decode_row(schema, &row)).transpose()
    }

    #[tracing::instrument(skip(self, query), fields(kind = query.schema().kind))]
    async fn find_where(&self, query: &QueryDescriptor) -> StoreResult<Vec<Record>> {
        if query.op() != QueryOp::Select {
            return Err(StoreError::InvalidQuery(format!(
                "find_where expects a select query, got {:?}",
                query.op()
            )));
        }

        let schema = query.schema();
        let mut builder = SqlBuilder::<Sqlite>::new("SELECT id");
        for field in schema.fields {
            builder.push(", ").push(field.column);
        }
        builder.push(" FROM ").push(schema.table);
        push_predicate(&mut builder, query.predicate());
        builder.push(" ORDER BY id");

        tracing::trace!(sql = %query.to_sql(), "Executing select");

        let mut records = Vec::new();
        let mut rows = builder.build().fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            records.push(decode_row(schema, &row)?);
        }
        Ok(records)
    }

    #[tracing::instrument(skip(self, record), fields(kind = record.kind(), id = ?record.id))]
    async fn merge(&self, record: Record) -> StoreResult<Record> {
        record.schema.validate_record(&record)?;
        let kind = record.kind();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;

        let updated = match record.id {
            Some(id) => Self::update_row(&mut tx, &record, id)
                .await
                .map_err(|e| StoreError::transaction(kind, e))?,
            None => false,
        };

        let stored = if updated {
            record
        } else {
            let id = Self::insert(&mut tx, &record)
                .await
                .map_err(|e| StoreError::transaction(kind, e))?;
            tracing::debug!(%id, "Merge inserted a new record");
            record.with_id(Some(id))
        };

        tx.commit()
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;
        Ok(stored)
    }

    #[tracing::instrument(skip(self, record), fields(kind = record.kind(), id = ?record.id))]
    async fn update(&self, record: Record) -> StoreResult<Option<Record>> {
        record.schema.validate_record(&record)?;
        let Some(id) = record.id else {
            return Ok(None);
        };
        let kind = record.kind();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;
        let updated = Self::update_row(&mut tx, &record, id)
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;
        tx.commit()
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;

        if !updated {
            tracing::debug!(%id, "Update of absent record ignored");
            return Ok(None);
        }
        Ok(Some(record))
    }

    #[tracing::instrument(skip(self, schema), fields(kind = schema.kind))]
    async fn remove(&self, schema: &'static EntitySchema, id: EntityId) -> StoreResult<bool> {
        let kind = schema.kind;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;

        let mut builder = SqlBuilder::<Sqlite>::new("DELETE FROM ");
        builder
            .push(schema.table)
            .push(" WHERE id = ")
            .push_bind(id.get());
        let result = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;

        let removed = result.rows_affected() > 0;
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

        let schema = query.schema();
        let kind = schema.kind;
        let mut builder = SqlBuilder::<Sqlite>::new("DELETE FROM ");
        builder.push(schema.table);
        push_predicate(&mut builder, query.predicate());

        tracing::trace!(sql = %query.to_sql(), "Executing delete");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;
        let result = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;
        tx.commit()
            .await
            .map_err(|e| StoreError::transaction(kind, e))?;

        let removed = result.rows_affected();
        tracing::debug!(removed, "Bulk remove applied");
        Ok(removed)
    }

    async fn count(&self, schema: &'static EntitySchema) -> StoreResult<u64> {
        let mut builder = SqlBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ");
        builder.push(schema.table);
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }
}
