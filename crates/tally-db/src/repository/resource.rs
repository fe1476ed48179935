//! Resource reads and staged resource writes.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tally_core::error::TallyResult;
use tally_core::models::resource::Resource;
use uuid::Uuid;

use super::{parse_record_id, record, record_list};
use crate::error::DbError;
use crate::transaction::Transaction;

#[derive(Debug, SurrealValue)]
struct ResourceRowWithId {
    record_id: String,
    resource_key: String,
}

pub(super) async fn list<C: Connection>(db: &Surreal<C>) -> TallyResult<Vec<Resource>> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, resource_key FROM resource \
             ORDER BY resource_key ASC",
        )
        .await
        .map_err(DbError::from)?;

    let rows: Vec<ResourceRowWithId> = result.take(0).map_err(DbError::from)?;
    let resources = rows
        .into_iter()
        .map(|row| {
            Ok(Resource {
                id: parse_record_id(&row.record_id)?,
                key: row.resource_key,
            })
        })
        .collect::<Result<Vec<_>, DbError>>()?;

    Ok(resources)
}

pub(super) fn stage_create(tx: &mut Transaction, keys: &[String]) {
    for key in keys {
        let key = tx.bind(key.as_str());
        tx.push(format!(
            "CREATE {} SET resource_key = {key}",
            record("resource", Uuid::new_v4())
        ));
    }
}

/// Group grants go first so no edge is left pointing at a deleted row.
pub(super) fn stage_delete(tx: &mut Transaction, ids: &[Uuid]) {
    if ids.is_empty() {
        return;
    }
    let targets = record_list("resource", ids);
    tx.push(format!("DELETE grants WHERE out IN {targets}"));
    tx.push(format!("DELETE resource WHERE id IN {targets}"));
}
