//! Role reads and staged role writes.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tally_core::error::TallyResult;
use tally_core::models::role::{Role, RoleMember, RoleSummary};
use tally_core::repository::{PaginatedResult, Pagination};
use uuid::Uuid;

use super::{CountRow, parse_record_id, record, record_list};
use crate::error::DbError;
use crate::transaction::Transaction;

#[derive(Debug, SurrealValue)]
struct RoleRow {
    name: String,
}

#[derive(Debug, SurrealValue)]
struct RoleRowWithId {
    record_id: String,
    name: String,
}

impl RoleRowWithId {
    fn try_into_summary(self) -> Result<RoleSummary, DbError> {
        Ok(RoleSummary {
            id: parse_record_id(&self.record_id)?,
            name: self.name,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct MemberRow {
    record_id: String,
    name: String,
    second_name: String,
    patronymic: String,
}

impl MemberRow {
    fn try_into_member(self) -> Result<RoleMember, DbError> {
        Ok(RoleMember {
            id: parse_record_id(&self.record_id)?,
            name: self.name,
            second_name: self.second_name,
            patronymic: self.patronymic,
        })
    }
}

pub(super) async fn get<C: Connection>(db: &Surreal<C>, id: Uuid) -> TallyResult<Role> {
    let id_str = id.to_string();

    let mut result = db
        .query(
            "SELECT name FROM type::record('role', $id); \
             SELECT meta::id(in) AS record_id, in.name AS name, \
                 in.second_name AS second_name, in.patronymic AS patronymic \
             FROM member_of WHERE out = type::record('role', $id) \
             ORDER BY name ASC;",
        )
        .bind(("id", id_str.clone()))
        .await
        .map_err(DbError::from)?;

    let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
    let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        entity: "role".into(),
        id: id_str,
    })?;
    let members: Vec<MemberRow> = result.take(1).map_err(DbError::from)?;

    Ok(Role {
        id,
        name: row.name,
        members: members
            .into_iter()
            .map(MemberRow::try_into_member)
            .collect::<Result<Vec<_>, DbError>>()?,
    })
}

pub(super) async fn find_by_name<C: Connection>(
    db: &Surreal<C>,
    name: &str,
) -> TallyResult<Option<Role>> {
    let mut result = db
        .query("SELECT meta::id(id) AS record_id, name FROM role WHERE name = $name")
        .bind(("name", name.to_string()))
        .await
        .map_err(DbError::from)?;

    let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
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
) -> TallyResult<PaginatedResult<RoleSummary>> {
    let mut count_result = db
        .query("SELECT count() AS total FROM role GROUP ALL")
        .await
        .map_err(DbError::from)?;
    let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
    let total = count_rows.first().map(|r| r.total).unwrap_or(0);

    let (mut result, offset, limit) = match pagination {
        Some(page) => (
            db.query(
                "SELECT meta::id(id) AS record_id, name FROM role \
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
            db.query(
                "SELECT meta::id(id) AS record_id, name FROM role \
                 ORDER BY name ASC",
            )
            .await
            .map_err(DbError::from)?,
            0,
            total,
        ),
    };

    let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
    let items = rows
        .into_iter()
        .map(RoleRowWithId::try_into_summary)
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
    tx.push(format!("CREATE {} SET name = {name}", record("role", id)));
}

pub(super) fn stage_rename(tx: &mut Transaction, id: Uuid, name: &str) {
    let name = tx.bind(name);
    tx.push(format!("UPDATE {} SET name = {name}", record("role", id)));
}

pub(super) fn stage_add_members(tx: &mut Transaction, role_id: Uuid, members: &[Uuid]) {
    let role = record("role", role_id);
    for member in members {
        tx.push(format!("RELATE {}->member_of->{role}", record("user", *member)));
    }
}

pub(super) fn stage_remove_members(tx: &mut Transaction, role_id: Uuid, members: &[Uuid]) {
    if members.is_empty() {
        return;
    }
    tx.push(format!(
        "DELETE member_of WHERE out = {} AND in IN {}",
        record("role", role_id),
        record_list("user", members)
    ));
}

pub(super) fn stage_delete(tx: &mut Transaction, id: Uuid) {
    let role = record("role", id);
    tx.push(format!("DELETE member_of WHERE out = {role}"));
    tx.push(format!("DELETE has_role WHERE out = {role}"));
    tx.push(format!("DELETE {role}"));
}
