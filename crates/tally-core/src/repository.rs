//! Repository and store trait definitions.
//!
//! Reads are plain async calls. Writes against the permission graph are
//! staged into a transaction handle obtained from
//! [`PermissionStore::begin`] and applied together by
//! [`PermissionStore::commit`], so a multi-step change is either fully
//! visible or not at all.

use uuid::Uuid;

use crate::error::TallyResult;
use crate::models::{
    admin_binding::AdminBinding,
    group::{Group, GroupSummary},
    identity::{CreateIdentity, Identity, UpdateIdentity},
    resource::Resource,
    role::{Role, RoleSummary},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Record kinds that graph updates may reference by uuid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Identity,
    Role,
    Resource,
}

impl RecordKind {
    pub fn entity(self) -> &'static str {
        match self {
            Self::Identity => "user",
            Self::Role => "role",
            Self::Resource => "resource",
        }
    }
}

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

pub trait IdentityRepository: Send + Sync {
    fn create(&self, input: CreateIdentity) -> impl Future<Output = TallyResult<Identity>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TallyResult<Identity>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = TallyResult<Identity>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateIdentity,
    ) -> impl Future<Output = TallyResult<Identity>> + Send;
    fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: String,
    ) -> impl Future<Output = TallyResult<()>> + Send;
    fn touch_last_login(&self, id: Uuid) -> impl Future<Output = TallyResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Permission graph
// ---------------------------------------------------------------------------

/// The read side needed on every request.
pub trait PermissionQuery: Send + Sync {
    /// Does `identity_id` reach `resource_key` through role -> group -> resource?
    fn has_permission(
        &self,
        identity_id: Uuid,
        resource_key: &str,
    ) -> impl Future<Output = TallyResult<bool>> + Send;

    /// Names of every group reachable from the identity's roles.
    fn group_names_for(
        &self,
        identity_id: Uuid,
    ) -> impl Future<Output = TallyResult<Vec<String>>> + Send;
}

pub trait PermissionStore: PermissionQuery {
    /// Transaction handle. Staged writes become visible only on commit.
    type Tx: Send;

    fn begin(&self) -> Self::Tx;

    /// Apply every staged write atomically. Returns the number of staged
    /// write statements; an empty handle is a no-op returning zero.
    fn commit(&self, tx: Self::Tx) -> impl Future<Output = TallyResult<usize>> + Send;

    fn find_missing(
        &self,
        kind: RecordKind,
        ids: &[Uuid],
    ) -> impl Future<Output = TallyResult<Vec<Uuid>>> + Send;

    // -- resources ---------------------------------------------------------

    fn list_resources(&self) -> impl Future<Output = TallyResult<Vec<Resource>>> + Send;
    fn stage_create_resources(&self, tx: &mut Self::Tx, keys: &[String]);
    fn stage_delete_resources(&self, tx: &mut Self::Tx, ids: &[Uuid]);

    // -- roles -------------------------------------------------------------

    fn get_role(&self, id: Uuid) -> impl Future<Output = TallyResult<Role>> + Send;
    fn find_role_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = TallyResult<Option<Role>>> + Send;
    fn list_roles(
        &self,
        pagination: Option<Pagination>,
    ) -> impl Future<Output = TallyResult<PaginatedResult<RoleSummary>>> + Send;
    fn stage_create_role(&self, tx: &mut Self::Tx, id: Uuid, name: &str);
    fn stage_rename_role(&self, tx: &mut Self::Tx, id: Uuid, name: &str);
    fn stage_add_role_members(&self, tx: &mut Self::Tx, role_id: Uuid, members: &[Uuid]);
    fn stage_remove_role_members(&self, tx: &mut Self::Tx, role_id: Uuid, members: &[Uuid]);
    /// Members first, then group links, then the role itself.
    fn stage_delete_role(&self, tx: &mut Self::Tx, id: Uuid);

    // -- groups ------------------------------------------------------------

    fn get_group(&self, id: Uuid) -> impl Future<Output = TallyResult<Group>> + Send;
    fn find_group_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = TallyResult<Option<Group>>> + Send;
    fn list_groups(
        &self,
        pagination: Option<Pagination>,
    ) -> impl Future<Output = TallyResult<PaginatedResult<GroupSummary>>> + Send;
    fn stage_create_group(&self, tx: &mut Self::Tx, id: Uuid, name: &str);
    fn stage_rename_group(&self, tx: &mut Self::Tx, id: Uuid, name: &str);
    fn stage_add_group_roles(&self, tx: &mut Self::Tx, group_id: Uuid, roles: &[Uuid]);
    fn stage_remove_group_roles(&self, tx: &mut Self::Tx, group_id: Uuid, roles: &[Uuid]);
    fn stage_add_group_resources(&self, tx: &mut Self::Tx, group_id: Uuid, resources: &[Uuid]);
    fn stage_remove_group_resources(
        &self,
        tx: &mut Self::Tx,
        group_id: Uuid,
        resources: &[Uuid],
    );
    /// Role links first, then resource links, then the group itself.
    fn stage_delete_group(&self, tx: &mut Self::Tx, id: Uuid);

    // -- admin binding -----------------------------------------------------

    fn get_admin_binding(&self) -> impl Future<Output = TallyResult<Option<AdminBinding>>> + Send;
    fn stage_put_admin_binding(&self, tx: &mut Self::Tx, binding: &AdminBinding);
}
