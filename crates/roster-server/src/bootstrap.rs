//! Startup wiring: build the repositories for the configured backend and
//! seed them before the listener binds.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::collection::InMemoryCollection;
use crate::config::{Config, SeedConfig, StoreBackend};
use crate::entity::{Employee, Entity, Student};
use crate::features::FeatureState;
use crate::repository::{Repository, StoreRepository};
use crate::store::{EntityStore, MemoryStore, SqlStore};

/// Records loaded into empty repositories at startup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub student: Vec<Student>,
    #[serde(default)]
    pub employee: Vec<Employee>,
}

impl SeedData {
    /// Records used when no seed file is configured
    pub fn builtin() -> Self {
        Self {
            student: vec![
                Student::new("Nikhil", "Singh").with_email("code.nikhil20@gmail.com"),
                Student::new("Ritik", "Nandan"),
                Student::new("Yash", "Agarwal").with_email("yashubhai@gmail.com"),
            ],
            employee: vec![
                Employee::new("Leslie", "Andrews").with_email("leslie@example.com"),
                Employee::new("Emma", "Baumgarten").with_email("emma@example.com"),
                Employee::new("Avani", "Gupta").with_email("avani@example.com"),
            ],
        }
    }

    /// Read a `{"student": [...], "employee": [...]}` document
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse seed file {}", path.display()))
    }

    pub fn from_config(config: &SeedConfig) -> anyhow::Result<Self> {
        match &config.file {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }
}

/// Create one repository per kind on top of the configured backend
pub async fn build_state(config: &Config) -> anyhow::Result<FeatureState> {
    let state = match config.store {
        StoreBackend::Sql => {
            let store = SqlStore::connect(&config.database)
                .await
                .with_context(|| format!("Failed to open database {}", config.database.url))?;
            store_state(Arc::new(store))
        },
        StoreBackend::Memory => store_state(Arc::new(MemoryStore::new())),
        StoreBackend::Collection => FeatureState {
            students: Arc::new(InMemoryCollection::<Student>::new()),
            employees: Arc::new(InMemoryCollection::<Employee>::new()),
        },
    };

    tracing::info!(backend = state.backend(), "Repositories ready");
    Ok(state)
}

fn store_state(store: Arc<dyn EntityStore>) -> FeatureState {
    FeatureState {
        students: Arc::new(StoreRepository::<Student>::new(Arc::clone(&store))),
        employees: Arc::new(StoreRepository::<Employee>::new(store)),
    }
}

/// Save `records` in order into an empty repository.
///
/// A repository that already holds data is left untouched. Returns the
/// number of records saved.
pub async fn seed<T: Entity>(repo: &dyn Repository<T>, records: Vec<T>) -> anyhow::Result<u64> {
    let kind = T::schema().kind;

    let existing = repo.count().await?;
    if existing > 0 {
        tracing::info!(kind, existing, "Repository already populated, skipping seed");
        return Ok(0);
    }

    let mut saved = 0;
    for (index, record) in records.into_iter().enumerate() {
        anyhow::ensure!(
            record.id().is_none(),
            "Seed {} #{} must not carry an id",
            kind,
            index
        );
        repo.save(record)
            .await
            .with_context(|| format!("Failed to seed {} #{}", kind, index))?;
        saved += 1;
    }

    tracing::info!(kind, saved, "Seeded repository");
    Ok(saved)
}

/// Seed every kind according to `config`
pub async fn seed_all(state: &FeatureState, config: &SeedConfig) -> anyhow::Result<()> {
    if !config.enabled {
        tracing::info!("Seeding disabled");
        return Ok(());
    }

    let data = SeedData::from_config(config)?;
    seed(state.students.as_ref(), data.student).await?;
    seed(state.employees.as_ref(), data.employee).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn memory_config(store: StoreBackend) -> Config {
        Config {
            store,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_builtin_seed_populates_both_kinds() {
        let config = memory_config(StoreBackend::Memory);
        let state = build_state(&config).await.unwrap();

        seed_all(&state, &config.seed).await.unwrap();

        let employees = state.employees.find_all().await.unwrap();
        let names: Vec<&str> = employees.iter().map(|e| e.first_name.as_str()).collect();
        assert_eq!(names, vec!["Leslie", "Emma", "Avani"]);
        assert_eq!(state.students.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_seed_skips_populated_repository() {
        let repo = InMemoryCollection::<Student>::new();
        repo.save(Student::new("Arjun", "Dev")).await.unwrap();

        let saved = seed::<Student>(&repo, SeedData::builtin().student).await.unwrap();
        assert_eq!(saved, 0);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_seed_disabled() {
        let mut config = memory_config(StoreBackend::Collection);
        config.seed.enabled = false;
        let state = build_state(&config).await.unwrap();

        seed_all(&state, &config.seed).await.unwrap();
        assert_eq!(state.students.count().await.unwrap(), 0);
        assert_eq!(state.backend(), "collection");
    }

    #[tokio::test]
    async fn test_seed_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"employee": [{{"firstName": "Kabir", "lastName": "Mehta"}}]}}"#
        )
        .unwrap();

        let mut config = memory_config(StoreBackend::Memory);
        config.seed.file = Some(file.path().to_path_buf());
        let state = build_state(&config).await.unwrap();

        seed_all(&state, &config.seed).await.unwrap();
        assert_eq!(state.employees.count().await.unwrap(), 1);
        assert_eq!(state.students.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_seed_record_fails_startup() {
        let repo = InMemoryCollection::<Student>::new();
        let err = seed::<Student>(&repo, vec![Student::new("Nikhil", "")]).await.unwrap_err();
        assert!(err.to_string().contains("student #0"));
    }

    #[test]
    fn test_missing_seed_file_is_error() {
        let err = SeedData::load(Path::new("/nonexistent/seed.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read seed file"));
    }
}
