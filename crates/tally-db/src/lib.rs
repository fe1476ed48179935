//! Tally Database: SurrealDB connection management and the store
//! implementations behind the `tally-core` traits.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Atomic write batches ([`Transaction`])
//! - [`SurrealPermissionStore`] and [`SurrealIdentityRepository`]

mod connection;
mod error;
pub mod repository;
mod schema;
mod transaction;

pub use connection::{DbConfig, DbCredentials, DbManager};
pub use error::DbError;
pub use repository::{SurrealIdentityRepository, SurrealPermissionStore};
pub use schema::{latest_version, run_migrations};
pub use transaction::Transaction;
