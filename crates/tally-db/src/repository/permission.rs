//! SurrealDB implementation of [`PermissionStore`].
//!
//! The permission edge is derived at query time:
//! `user -member_of-> role <-has_role- access_group -grants-> resource`.
//! Nothing about it is cached between calls.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tally_core::error::TallyResult;
use tally_core::models::admin_binding::AdminBinding;
use tally_core::models::group::{Group, GroupSummary};
use tally_core::models::resource::Resource;
use tally_core::models::role::{Role, RoleSummary};
use tally_core::repository::{
    PaginatedResult, Pagination, PermissionQuery, PermissionStore, RecordKind,
};
use uuid::Uuid;

use super::{CountRow, group, parse_record_id, record_list, resource, role};
use crate::error::DbError;
use crate::transaction::Transaction;

#[derive(Debug, SurrealValue)]
struct NameRow {
    name: String,
}

#[derive(Debug, SurrealValue)]
struct IdRow {
    record_id: String,
}

#[derive(Debug, SurrealValue)]
struct BindingRow {
    role_name: String,
    group_name: String,
    version: u64,
}

/// SurrealDB-backed permission graph.
#[derive(Clone)]
pub struct SurrealPermissionStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    pub fn client(&self) -> &Surreal<C> {
        &self.db
    }
}

impl<C: Connection> PermissionQuery for SurrealPermissionStore<C> {
    async fn has_permission(&self, identity_id: Uuid, resource_key: &str) -> TallyResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM grants \
                 WHERE out.resource_key = $resource_key \
                 AND in IN (\
                     SELECT VALUE in FROM has_role \
                     WHERE out IN (\
                         SELECT VALUE out FROM member_of \
                         WHERE in = type::record('user', $user_id)\
                     )\
                 ) GROUP ALL",
            )
            .bind(("resource_key", resource_key.to_string()))
            .bind(("user_id", identity_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn group_names_for(&self, identity_id: Uuid) -> TallyResult<Vec<String>> {
        let mut result = self
            .db
            .query(
                "SELECT name FROM access_group \
                 WHERE id IN (\
                     SELECT VALUE in FROM has_role \
                     WHERE out IN (\
                         SELECT VALUE out FROM member_of \
                         WHERE in = type::record('user', $user_id)\
                     )\
                 ) ORDER BY name ASC",
            )
            .bind(("user_id", identity_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NameRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }
}

impl<C: Connection> PermissionStore for SurrealPermissionStore<C> {
    type Tx = Transaction;

    fn begin(&self) -> Transaction {
        Transaction::new()
    }

    async fn commit(&self, tx: Transaction) -> TallyResult<usize> {
        Ok(tx.commit(&self.db).await?)
    }

    async fn find_missing(&self, kind: RecordKind, ids: &[Uuid]) -> TallyResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let table = kind.entity();
        let query = format!(
            "SELECT meta::id(id) AS record_id FROM {table} WHERE id IN {}",
            record_list(table, ids)
        );

        let mut result = self.db.query(query).await.map_err(DbError::from)?;
        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        let found = rows
            .iter()
            .map(|r| parse_record_id(&r.record_id))
            .collect::<Result<std::collections::HashSet<_>, DbError>>()?;

        Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
    }

    async fn list_resources(&self) -> TallyResult<Vec<Resource>> {
        resource::list(&self.db).await
    }

    fn stage_create_resources(&self, tx: &mut Transaction, keys: &[String]) {
        resource::stage_create(tx, keys);
    }

    fn stage_delete_resources(&self, tx: &mut Transaction, ids: &[Uuid]) {
        resource::stage_delete(tx, ids);
    }

    async fn get_role(&self, id: Uuid) -> TallyResult<Role> {
        role::get(&self.db, id).await
    }

    async fn find_role_by_name(&self, name: &str) -> TallyResult<Option<Role>> {
        role::find_by_name(&self.db, name).await
    }

    async fn list_roles(
        &self,
        pagination: Option<Pagination>,
    ) -> TallyResult<PaginatedResult<RoleSummary>> {
        role::list(&self.db, pagination).await
    }

    fn stage_create_role(&self, tx: &mut Transaction, id: Uuid, name: &str) {
        role::stage_create(tx, id, name);
    }

    fn stage_rename_role(&self, tx: &mut Transaction, id: Uuid, name: &str) {
        role::stage_rename(tx, id, name);
    }

    fn stage_add_role_members(&self, tx: &mut Transaction, role_id: Uuid, members: &[Uuid]) {
        role::stage_add_members(tx, role_id, members);
    }

    fn stage_remove_role_members(&self, tx: &mut Transaction, role_id: Uuid, members: &[Uuid]) {
        role::stage_remove_members(tx, role_id, members);
    }

    fn stage_delete_role(&self, tx: &mut Transaction, id: Uuid) {
        role::stage_delete(tx, id);
    }

    async fn get_group(&self, id: Uuid) -> TallyResult<Group> {
        group::get(&self.db, id).await
    }

    async fn find_group_by_name(&self, name: &str) -> TallyResult<Option<Group>> {
        group::find_by_name(&self.db, name).await
    }

    async fn list_groups(
        &self,
        pagination: Option<Pagination>,
    ) -> TallyResult<PaginatedResult<GroupSummary>> {
        group::list(&self.db, pagination).await
    }

    fn stage_create_group(&self, tx: &mut Transaction, id: Uuid, name: &str) {
        group::stage_create(tx, id, name);
    }

    fn stage_rename_group(&self, tx: &mut Transaction, id: Uuid, name: &str) {
        group::stage_rename(tx, id, name);
    }

    fn stage_add_group_roles(&self, tx: &mut Transaction, group_id: Uuid, roles: &[Uuid]) {
        group::stage_add_roles(tx, group_id, roles);
    }

    fn stage_remove_group_roles(&self, tx: &mut Transaction, group_id: Uuid, roles: &[Uuid]) {
        group::stage_remove_roles(tx, group_id, roles);
    }

    fn stage_add_group_resources(&self, tx: &mut Transaction, group_id: Uuid, resources: &[Uuid]) {
        group::stage_add_resources(tx, group_id, resources);
    }

    fn stage_remove_group_resources(
        &self,
        tx: &mut Transaction,
        group_id: Uuid,
        resources: &[Uuid],
    ) {
        group::stage_remove_resources(tx, group_id, resources);
    }

    fn stage_delete_group(&self, tx: &mut Transaction, id: Uuid) {
        group::stage_delete(tx, id);
    }

    async fn get_admin_binding(&self) -> TallyResult<Option<AdminBinding>> {
        let mut result = self
            .db
            .query("SELECT role_name, group_name, version FROM admin_binding:current")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BindingRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(|row| AdminBinding {
            role_name: row.role_name,
            group_name: row.group_name,
            version: row.version,
        }))
    }

    fn stage_put_admin_binding(&self, tx: &mut Transaction, binding: &AdminBinding) {
        let role_name = tx.bind(binding.role_name.as_str());
        let group_name = tx.bind(binding.group_name.as_str());
        tx.push(format!(
            "UPSERT admin_binding:current SET role_name = {role_name}, \
             group_name = {group_name}, version = {}",
            binding.version
        ));
    }
}
