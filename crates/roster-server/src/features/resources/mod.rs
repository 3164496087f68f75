//! REST surface shared by every entity kind

pub mod routes;

pub use routes::{resource_routes, ResourceState};
