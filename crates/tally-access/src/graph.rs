//! Role and group editing through set diffs.
//!
//! Every update loads the current membership, diffs it against the desired
//! set and stages only the difference, so re-applying the same input is
//! free. A rename and all of its diffs share one transaction.

use std::collections::BTreeSet;

use serde::Deserialize;
use tally_core::diff::SetDiff;
use tally_core::error::{TallyError, TallyResult};
use tally_core::models::group::{Group, GroupSummary};
use tally_core::models::resource::Resource;
use tally_core::models::role::{Role, RoleSummary};
use tally_core::repository::{PaginatedResult, Pagination, PermissionStore, RecordKind};
use tracing::info;
use uuid::Uuid;

/// Desired state of a role.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleInput {
    pub name: String,
    #[serde(default)]
    pub members: Vec<Uuid>,
}

/// Desired state of a group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupInput {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Uuid>,
    #[serde(default)]
    pub resources: Vec<Uuid>,
}

/// Stage `create(to_add)` and `remove(to_remove)` for the difference
/// between `current` and `desired`. Empty halves stage nothing.
pub fn stage_diff<T, Tx>(
    tx: &mut Tx,
    current: &BTreeSet<T>,
    desired: &BTreeSet<T>,
    create: impl FnOnce(&mut Tx, &[T]),
    remove: impl FnOnce(&mut Tx, &[T]),
) -> SetDiff<T>
where
    T: Ord + Clone,
{
    let diff = SetDiff::between(current, desired);
    if !diff.to_add.is_empty() {
        create(tx, &diff.to_add);
    }
    if !diff.to_remove.is_empty() {
        remove(tx, &diff.to_remove);
    }
    diff
}

fn clean_name(name: &str) -> TallyResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TallyError::validation("name must not be empty"));
    }
    Ok(name)
}

pub struct RoleGroupGraph<S> {
    store: S,
}

impl<S: PermissionStore> RoleGroupGraph<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Diff `current` against `desired` and apply the result in its own
    /// transaction. Returns the applied diff.
    pub async fn diff_and_apply<T>(
        &self,
        current: &BTreeSet<T>,
        desired: &BTreeSet<T>,
        create: impl FnOnce(&S, &mut S::Tx, &[T]),
        remove: impl FnOnce(&S, &mut S::Tx, &[T]),
    ) -> TallyResult<SetDiff<T>>
    where
        T: Ord + Clone,
    {
        let store = &self.store;
        let mut tx = store.begin();
        let diff = stage_diff(
            &mut tx,
            current,
            desired,
            |tx, items| create(store, tx, items),
            |tx, items| remove(store, tx, items),
        );
        store.commit(tx).await?;
        Ok(diff)
    }

    // -- reads -------------------------------------------------------------

    pub async fn list_resources(&self) -> TallyResult<Vec<Resource>> {
        self.store.list_resources().await
    }

    pub async fn get_role(&self, id: Uuid) -> TallyResult<Role> {
        self.store.get_role(id).await
    }

    pub async fn list_roles(
        &self,
        pagination: Option<Pagination>,
    ) -> TallyResult<PaginatedResult<RoleSummary>> {
        self.store.list_roles(pagination).await
    }

    pub async fn get_group(&self, id: Uuid) -> TallyResult<Group> {
        self.store.get_group(id).await
    }

    pub async fn list_groups(
        &self,
        pagination: Option<Pagination>,
    ) -> TallyResult<PaginatedResult<GroupSummary>> {
        self.store.list_groups(pagination).await
    }

    // -- roles -------------------------------------------------------------

    pub async fn create_role(&self, input: RoleInput) -> TallyResult<Role> {
        let name = clean_name(&input.name)?;
        if self.store.find_role_by_name(name).await?.is_some() {
            return Err(TallyError::AlreadyExists {
                entity: "role".into(),
            });
        }
        let members: BTreeSet<Uuid> = input.members.into_iter().collect();
        self.ensure_exist(RecordKind::Identity, &members).await?;

        let id = Uuid::new_v4();
        let mut tx = self.store.begin();
        self.store.stage_create_role(&mut tx, id, name);
        let members: Vec<Uuid> = members.into_iter().collect();
        self.store.stage_add_role_members(&mut tx, id, &members);
        self.store.commit(tx).await?;

        info!(role = %id, name, members = members.len(), "role created");
        self.store.get_role(id).await
    }

    /// Rename the role and converge its membership to `input.members`.
    pub async fn update_role(&self, id: Uuid, input: RoleInput) -> TallyResult<Role> {
        let role = self.store.get_role(id).await?;
        let name = clean_name(&input.name)?;
        if name != role.name {
            self.ensure_role_name_free(name, id).await?;
        }
        let desired: BTreeSet<Uuid> = input.members.into_iter().collect();
        self.ensure_exist(RecordKind::Identity, &desired).await?;
        let current: BTreeSet<Uuid> = role.member_ids().collect();

        let store = &self.store;
        let mut tx = store.begin();
        if name != role.name {
            store.stage_rename_role(&mut tx, id, name);
        }
        let diff = stage_diff(
            &mut tx,
            &current,
            &desired,
            |tx, add| store.stage_add_role_members(tx, id, add),
            |tx, remove| store.stage_remove_role_members(tx, id, remove),
        );
        let writes = store.commit(tx).await?;

        info!(
            role = %id,
            added = diff.to_add.len(),
            removed = diff.to_remove.len(),
            writes,
            "role updated"
        );
        store.get_role(id).await
    }

    /// Strip members and group links, then drop the role.
    pub async fn delete_role(&self, id: Uuid) -> TallyResult<()> {
        self.store.get_role(id).await?;
        let mut tx = self.store.begin();
        self.store.stage_delete_role(&mut tx, id);
        self.store.commit(tx).await?;
        info!(role = %id, "role deleted");
        Ok(())
    }

    // -- groups ------------------------------------------------------------

    pub async fn create_group(&self, input: GroupInput) -> TallyResult<Group> {
        let name = clean_name(&input.name)?;
        if self.store.find_group_by_name(name).await?.is_some() {
            return Err(TallyError::AlreadyExists {
                entity: "group".into(),
            });
        }
        let roles: BTreeSet<Uuid> = input.roles.into_iter().collect();
        let resources: BTreeSet<Uuid> = input.resources.into_iter().collect();
        self.ensure_exist(RecordKind::Role, &roles).await?;
        self.ensure_exist(RecordKind::Resource, &resources).await?;

        let id = Uuid::new_v4();
        let mut tx = self.store.begin();
        self.store.stage_create_group(&mut tx, id, name);
        let roles: Vec<Uuid> = roles.into_iter().collect();
        let resources: Vec<Uuid> = resources.into_iter().collect();
        self.store.stage_add_group_roles(&mut tx, id, &roles);
        self.store.stage_add_group_resources(&mut tx, id, &resources);
        self.store.commit(tx).await?;

        info!(group = %id, name, "group created");
        self.store.get_group(id).await
    }

    /// Rename the group and converge both its role and resource sets.
    pub async fn update_group(&self, id: Uuid, input: GroupInput) -> TallyResult<Group> {
        let group = self.store.get_group(id).await?;
        let name = clean_name(&input.name)?;
        if name != group.name {
            self.ensure_group_name_free(name, id).await?;
        }
        let desired_roles: BTreeSet<Uuid> = input.roles.into_iter().collect();
        let desired_resources: BTreeSet<Uuid> = input.resources.into_iter().collect();
        self.ensure_exist(RecordKind::Role, &desired_roles).await?;
        self.ensure_exist(RecordKind::Resource, &desired_resources).await?;

        let current_roles: BTreeSet<Uuid> = group.role_ids().collect();
        let current_resources: BTreeSet<Uuid> = group.resource_ids().collect();

        let store = &self.store;
        let mut tx = store.begin();
        if name != group.name {
            store.stage_rename_group(&mut tx, id, name);
        }
        let roles = stage_diff(
            &mut tx,
            &current_roles,
            &desired_roles,
            |tx, add| store.stage_add_group_roles(tx, id, add),
            |tx, remove| store.stage_remove_group_roles(tx, id, remove),
        );
        let resources = stage_diff(
            &mut tx,
            &current_resources,
            &desired_resources,
            |tx, add| store.stage_add_group_resources(tx, id, add),
            |tx, remove| store.stage_remove_group_resources(tx, id, remove),
        );
        let writes = store.commit(tx).await?;

        info!(
            group = %id,
            roles_changed = roles.len(),
            resources_changed = resources.len(),
            writes,
            "group updated"
        );
        store.get_group(id).await
    }

    /// Strip role links, then resource links, then drop the group.
    pub async fn delete_group(&self, id: Uuid) -> TallyResult<()> {
        self.store.get_group(id).await?;
        let mut tx = self.store.begin();
        self.store.stage_delete_group(&mut tx, id);
        self.store.commit(tx).await?;
        info!(group = %id, "group deleted");
        Ok(())
    }

    // -- helpers -----------------------------------------------------------

    async fn ensure_exist(&self, kind: RecordKind, ids: &BTreeSet<Uuid>) -> TallyResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = ids.iter().copied().collect();
        let missing = self.store.find_missing(kind, &ids).await?;
        match missing.first() {
            Some(id) => Err(TallyError::not_found(kind.entity(), id)),
            None => Ok(()),
        }
    }

    async fn ensure_role_name_free(&self, name: &str, owner: Uuid) -> TallyResult<()> {
        match self.store.find_role_by_name(name).await? {
            Some(other) if other.id != owner => Err(TallyError::AlreadyExists {
                entity: "role".into(),
            }),
            _ => Ok(()),
        }
    }

    async fn ensure_group_name_free(&self, name: &str, owner: Uuid) -> TallyResult<()> {
        match self.store.find_group_by_name(name).await? {
            Some(other) if other.id != owner => Err(TallyError::AlreadyExists {
                entity: "group".into(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_diff_calls_only_non_empty_halves() {
        let current = BTreeSet::from([1, 2, 3]);
        let desired = BTreeSet::from([2, 3, 4, 5]);
        let mut log: Vec<String> = Vec::new();

        let diff = stage_diff(
            &mut log,
            &current,
            &desired,
            |log, add| log.push(format!("add {add:?}")),
            |log, remove| log.push(format!("remove {remove:?}")),
        );

        assert_eq!(diff.to_add, vec![4, 5]);
        assert_eq!(diff.to_remove, vec![1]);
        assert_eq!(log, vec!["add [4, 5]", "remove [1]"]);

        let mut log: Vec<String> = Vec::new();
        let diff = stage_diff(
            &mut log,
            &desired,
            &desired,
            |log, add| log.push(format!("add {add:?}")),
            |log, remove| log.push(format!("remove {remove:?}")),
        );
        assert!(diff.is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn empty_desired_removes_everything() {
        let current = BTreeSet::from(["a", "b"]);
        let mut removed = Vec::new();
        stage_diff(
            &mut removed,
            &current,
            &BTreeSet::new(),
            |_, _| unreachable!("nothing to add"),
            |removed, items| removed.extend_from_slice(items),
        );
        assert_eq!(removed, vec!["a", "b"]);
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(clean_name("   ").is_err());
        assert_eq!(clean_name("  ops ").unwrap(), "ops");
    }
}
