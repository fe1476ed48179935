//! SurrealDB repository implementations.

mod group;
mod identity;
mod permission;
mod resource;
mod role;

pub use identity::SurrealIdentityRepository;
pub use permission::SurrealPermissionStore;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Record literal for a uuid-keyed row, e.g. ``role:`4f1c…` ``.
fn record(table: &str, id: Uuid) -> String {
    format!("{table}:`{id}`")
}

fn record_list(table: &str, ids: &[Uuid]) -> String {
    let items: Vec<String> = ids.iter().map(|id| record(table, *id)).collect();
    format!("[{}]", items.join(", "))
}

fn parse_record_id(raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))
}
