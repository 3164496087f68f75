use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

use super::Repository;
use crate::entity::{Entity, EntityId, FieldValue};
use crate::query::QueryBuilder;
use crate::store::{EntityStore, StoreError, StoreResult};

/// [`Repository`] that delegates to a shared [`EntityStore`]
pub struct StoreRepository<T> {
    store: Arc<dyn EntityStore>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> StoreRepository<T> {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    fn decode(record: crate::entity::Record) -> StoreResult<T> {
        T::from_record(record).map_err(|e| StoreError::decode(T::schema().kind, e))
    }
}

impl<T> Clone for StoreRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for StoreRepository<T> {
    fn backend(&self) -> &'static str {
        self.store.backend()
    }

    #[tracing::instrument(skip(self, entity), fields(kind = T::schema().kind, id = ?entity.id()))]
    async fn save(&self, mut entity: T) -> StoreResult<T> {
        entity.validate()?;

        match entity.id() {
            None => {
                let id = self.store.persist(entity.to_record()).await?;
                entity.set_id(id);
                Ok(entity)
            },
            Some(_) => {
                let stored = self.store.merge(entity.to_record()).await?;
                Self::decode(stored)
            },
        }
    }

    #[tracing::instrument(skip(self, entity), fields(kind = T::schema().kind, id = ?entity.id()))]
    async fn update(&self, entity: T) -> StoreResult<Option<T>> {
        entity.validate()?;

        self.store
            .update(entity.to_record())
            .await?
            .map(Self::decode)
            .transpose()
    }

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<T>> {
        self.store
            .find(T::schema(), id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    async fn find_all(&self) -> StoreResult<Vec<T>> {
        self.store
            .find_all(T::schema())
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    async fn delete_by_id(&self, id: EntityId) -> StoreResult<bool> {
        self.store.remove(T::schema(), id).await
    }

    async fn delete_where(&self, field: &str, value: FieldValue) -> StoreResult<u64> {
        let query = QueryBuilder::delete_where_equals(T::schema(), field, value)?;
        self.store.remove_where(&query).await
    }

    async fn count(&self) -> StoreResult<u64> {
        self.store.count(T::schema()).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Employee, Student};
    use crate::store::MemoryStore;
    use roster_common::ValidationError;

    fn students() -> StoreRepository<Student> {
        StoreRepository::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_save_then_find_returns_same_fields() {
        let repo = students();

        let saved = repo
            .save(Student::new("Nikhil", "Singh").with_email("code.nikhil20@gmail.com"))
            .await
            .unwrap();
        assert_eq!(saved.id, Some(EntityId::FIRST));

        let found = repo.find_by_id(EntityId::FIRST).await.unwrap().unwrap();
        assert_eq!(found, saved);
    }

    #[tokio::test]
    async fn test_save_with_id_updates() {
        let repo = students();
        let mut saved = repo.save(Student::new("Ritik", "Nandan")).await.unwrap();

        saved.last_name = "Kumar".to_string();
        let updated = repo.save(saved.clone()).await.unwrap();

        assert_eq!(updated, saved);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_does_not_recreate_deleted_entity() {
        let repo = students();
        let mut saved = repo.save(Student::new("Ritik", "Nandan")).await.unwrap();
        let id = saved.id.unwrap();
        assert!(repo.delete_by_id(id).await.unwrap());

        saved.last_name = "Kumar".to_string();
        assert!(repo.update(saved).await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_without_id_is_none() {
        let repo = students();
        repo.save(Student::new("Ritik", "Nandan")).await.unwrap();

        assert!(repo
            .update(Student::new("Yash", "Agarwal"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_save_rejects_malformed_email() {
        let repo = students();
        let err = repo
            .save(Student::new("Yash", "Agarwal").with_email("yash.example.com"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidEmail { .. })
        ));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_id_then_find_is_none() {
        let repo = students();
        let saved = repo.save(Student::new("Nikhil", "Singh")).await.unwrap();
        let id = saved.id.unwrap();

        assert!(repo.delete_by_id(id).await.unwrap());
        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert!(!repo.exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_where_unknown_field() {
        let repo: StoreRepository<Employee> = StoreRepository::new(Arc::new(MemoryStore::new()));
        let err = repo
            .delete_where("salary", FieldValue::from("10"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::UnknownField { .. })
        ));
    }

    #[tokio::test]
    async fn test_kinds_share_store_without_mixing() {
        let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
        let students: StoreRepository<Student> = StoreRepository::new(Arc::clone(&store));
        let employees: StoreRepository<Employee> = StoreRepository::new(store);

        students.save(Student::new("Nikhil", "Singh")).await.unwrap();
        employees.save(Employee::new("Leslie", "Andrews")).await.unwrap();
        employees.save(Employee::new("Emma", "Baumgarten")).await.unwrap();

        assert_eq!(students.find_all().await.unwrap().len(), 1);
        assert_eq!(employees.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_all_after_saves_and_deletes() {
        let repo = students();
        for (first, last) in [
            ("Arjun", "Dev"),
            ("Nikhil", "Singh"),
            ("Kavya", "Dev"),
            ("Ritik", "Nandan"),
            ("Yash", "Agarwal"),
        ] {
            repo.save(Student::new(first, last)).await.unwrap();
        }

        assert_eq!(
            repo.delete_where("lastName", FieldValue::from("Dev")).await.unwrap(),
            2
        );
        assert!(repo.delete_by_id(EntityId::new(5).unwrap()).await.unwrap());

        let remaining = repo.find_all().await.unwrap();
        let names: Vec<&str> = remaining.iter().map(|s| s.first_name.as_str()).collect();
        assert_eq!(names, vec!["Nikhil", "Ritik"]);
    }
}
