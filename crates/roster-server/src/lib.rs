//! Roster Server Library
//!
//! Generic entity persistence with a thin REST surface over student and
//! employee records.
//!
//! # Architecture
//!
//! Requests flow through three layers, each depending only on the one below:
//!
//! - **Features** (`features`): Axum handlers mounted at `/api/{kind}`,
//!   generic over the entity type
//! - **Repositories** (`repository`, `collection`): typed CRUD per kind,
//!   held by handlers as `Arc<dyn Repository<T>>`
//! - **Stores** (`store`): untyped, transactional persistence of
//!   [`entity::Record`]s, either SQLite or process memory
//!
//! Entity kinds describe themselves through a static [`entity::EntitySchema`].
//! Query text is built from the schema only; caller-supplied values are
//! always bound parameters (see [`query::QueryBuilder`]).
//!
//! # Example
//!
//! ```no_run
//! use roster_server::{api, bootstrap, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let state = bootstrap::build_state(&config).await?;
//!     bootstrap::seed_all(&state, &config.seed).await?;
//!     api::serve(&config, state).await
//! }
//! ```

pub mod api;
pub mod bootstrap;
pub mod collection;
pub mod config;
pub mod entity;
pub mod error;
pub mod features;
pub mod middleware;
pub mod query;
pub mod repository;
pub mod store;

// Re-export commonly used types
pub use error::{ApiResult, AppError};
