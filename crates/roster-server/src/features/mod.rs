//! Feature modules implementing the roster API
//!
//! Each entity kind is mounted under its own path prefix, taken from the
//! kind's schema:
//!
//! - `/student` - student records
//! - `/employee` - employee records
//!
//! Both share the generic handlers in [`resources`].

pub mod resources;

use axum::Router;
use std::sync::Arc;

use crate::entity::{Employee, Entity, Student};
use crate::repository::Repository;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub students: Arc<dyn Repository<Student>>,
    pub employees: Arc<dyn Repository<Employee>>,
}

impl FeatureState {
    /// Name of the storage backend serving requests
    pub fn backend(&self) -> &'static str {
        self.students.backend()
    }
}

/// Creates the API router with one nested router per entity kind
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest(
            &format!("/{}", Student::schema().kind),
            resources::resource_routes::<Student>().with_state(state.students),
        )
        .nest(
            &format!("/{}", Employee::schema().kind),
            resources::resource_routes::<Employee>().with_state(state.employees),
        )
}
