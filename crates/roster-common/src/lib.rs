//! Roster Common Library
//!
//! Shared error types, field validation and logging setup for the roster
//! workspace.
//!
//! # Overview
//!
//! - **Validation**: [`ValidationError`] and the field checks every entity kind
//!   runs before it reaches a store
//! - **Logging**: `tracing` subscriber configuration shared by all binaries
//!
//! # Example
//!
//! ```no_run
//! use roster_common::logging::{init_logging, LogConfig};
//! use roster_common::validation::validate_name;
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     validate_name("firstName", "Nikhil", 45)?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod validation;

pub use error::{ValidationError, ValidationResult};
