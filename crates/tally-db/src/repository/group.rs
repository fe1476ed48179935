//! Group reads and staged group writes.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tally_core::error::TallyResult;
use tally_core::models::group::{Group, GroupSummary};
use tally_core::models::resource::Resource;
use tally_core::models::role::RoleSummary;
use tally_core::repository::{PaginatedResult, Pagination};
use uuid::Uuid;

use super::{CountRow, parse_record_id, record, record_list};
use crate::error::DbError;
use crate::transaction::Transaction;

const TABLE: &str = "access_group";

#[derive(Debug, SurrealValue)]
struct GroupRow {
    name: String,
}

#[derive(Debug, SurrealValue)]
struct NamedRowWithId {
    record_id: String,
    name: String,
}

#[derive(Debug, SurrealValue)]
struct ResourceRowWithId {
    record_id: String,
    resource_key: String,
}

pub(super) async fn get<C: Connection>(db: &Surreal<C>, id: Uuid) -> TallyResult<Group> {
    let id_str = id.to_string();

    let mut result = db
        .query(
            "SELECT name FROM type::record('access_group', $id); \
             SELECT meta::id(id) AS record_id, name FROM role \
             WHERE id IN (\
                 SELECT VALUE out FROM has_role \
                 WHERE in = type::record('access_group', $id)\
             ) ORDER BY name ASC; \
             SELECT meta::id(id) AS record_id, resource_key FROM resource \
             WHERE id IN (\
                 SELECT VALUE out FROM grants \
                 WHERE in = type::record('access_group', $id)\
             ) ORDER BY resource_key ASC;",
        )
        .bind(("id", id_str.clone()))
        .await
        .map_err(DbError::from)?;

    let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
    let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        entity: "group".into(),
        id: id_str,
    })?;
    let roles: Vec<NamedRowWithId> = result.take(1).map_err(DbError::from)?;
    let resources: Vec<ResourceRowWithId> = result.take(2).map_err(DbError::from)?;

    let roles = roles
        .into_iter()
        .map(|r| {
            Ok(RoleSummary {
                id: parse_record_id(&r.record_id)?,
                name: r.name,
            })
        })
        .collect::<Result<Vec<_>, DbError>>()?;
    let resources = resources
        .into_iter()
        .map(|r| {
            Ok(Resource {
                id: parse_record_id(&r.record_id)?,
                key: r.resource_key,
            })
        })
        .collect::<Result<Vec<_>, DbError>>()?;

    Ok(Group {
        id,
        name: row.name,
        roles,
        resources,
    })
}

pub(super) async fn find_by_name<C: Connection>(
    db: &Surreal<C>,
    name: &str,
) -> TallyResult<Option<Group>> {
    let mut result = db
        .query("SELECT meta::id(id) AS record_id, name FROM access_group WHERE name = $name")
        .bind(("name", name.to_string()))
        .await
        .map_err(DbError::from)?;

    let rows: Vec<NamedRowWithId> = result.take(0).map_err(DbError::from)?;
    match rows.into_iter().next() {
        Some(row) => {
            let id = parse_record_id(&row.record_id)?;
            Ok(Some(get(db, id).await?))
        }
        None => Ok(None),
    }
}

pub(super) async fn list<C: Connection>(
    db: &Surreal<C>,
    pagination: Option<Pagination>,
) -> TallyResult<PaginatedResult<GroupSummary>> {
    let mut count_result = db
        .query("SELECT count() AS total FROM access_group GROUP ALL")
        .await
        .map_err(DbError::from)?;
    let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
    let total = count_rows.first().map(|r| r.total).unwrap_or(0);

    let (mut result, offset, limit) = match pagination {
        Some(page) => (
            db.query(
                "SELECT meta::id(id) AS record_id, name FROM access_group \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", page.limit))
            .bind(("offset", page.offset))
            .await
            .map_err(DbError::from)?,
            page.offset,
            page.limit,
        ),
        None => (
            db.query("SELECT meta::id(id) AS record_id, name FROM access_group ORDER BY name ASC")
                .await
                .map_err(DbError::from)?,
            0,
            total,
        ),
    };

    let rows: Vec<NamedRowWithId> = result.take(0).map_err(DbError::from)?;
    let items = rows
        .into_iter()
        .map(|r| {
            Ok(GroupSummary {
                id: parse_record_id(&r.record_id)?,
                name: r.name,
            })
        })
        .collect::<Result<Vec<_>, DbError>>()?;

    Ok(PaginatedResult {
        items,
        total,
        offset,
        limit,
    })
}

pub(super) fn stage_create(tx: &mut Transaction, id: Uuid, name: &str) {
    let name = tx.bind(name);
    tx.push(format!("CREATE {} SET name = {name}", record(TABLE, id)));
}

pub(super) fn stage_rename(tx: &mut Transaction, id: Uuid, name: &str) {
    let name = tx.bind(name);
    tx.push(format!("UPDATE {} SET name = {name}", record(TABLE, id)));
}

pub(super) fn stage_add_roles(tx: &mut Transaction, group_id: Uuid, roles: &[Uuid]) {
    let group = record(TABLE, group_id);
    for role in roles {
        tx.push(format!("RELATE {group}->has_role->{}", record("role", *role)));
    }
}

pub(super) fn stage_remove_roles(tx: &mut Transaction, group_id: Uuid, roles: &[Uuid]) {
    if roles.is_empty() {
        return;
    }
    tx.push(format!(
        "DELETE has_role WHERE in = {} AND out IN {}",
        record(TABLE, group_id),
        record_list("role", roles)
    ));
}

pub(super) fn stage_add_resources(tx: &mut Transaction, group_id: Uuid, resources: &[Uuid]) {
    let group = record(TABLE, group_id);
    for resource in resources {
        tx.push(format!("RELATE {group}->grants->{}", record("resource", *resource)));
    }
}

pub(super) fn stage_remove_resources(tx: &mut Transaction, group_id: Uuid, resources: &[Uuid]) {
    if resources.is_empty() {
        return;
    }
    tx.push(format!(
        "DELETE grants WHERE in = {} AND out IN {}",
        record(TABLE, group_id),
        record_list("resource", resources)
    ));
}

pub(super) fn stage_delete(tx: &mut Transaction, id: Uuid) {
    let group = record(TABLE, id);
    tx.push(format!("DELETE has_role WHERE in = {group}"));
    tx.push(format!("DELETE grants WHERE in = {group}"));
    tx.push(format!("DELETE {group}"));
}
