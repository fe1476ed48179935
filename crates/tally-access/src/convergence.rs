//! Brings the admin role and group in line with configuration at startup.
//!
//! The names applied by the previous run are kept in the store's admin
//! binding and updated in the same transaction as the role and group
//! writes, so the binding can never disagree with what was committed.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tally_core::error::{TallyError, TallyResult};
use tally_core::models::admin_binding::AdminBinding;
use tally_core::repository::PermissionStore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::graph::stage_diff;
use crate::name_cache::AdminNameCache;

#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub role_name: String,
    pub group_name: String,
    /// YAML file written by older deployments. Seeds an empty store and is
    /// mirrored after every convergence.
    pub legacy_cache_path: Option<PathBuf>,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            role_name: "admin".into(),
            group_name: "administrators".into(),
            legacy_cache_path: None,
        }
    }
}

/// How the admin role or group was brought to its configured name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was recorded before; created fresh.
    Created,
    /// The recorded one had vanished; created again.
    Recreated,
    /// The recorded one was renamed to the configured name.
    Renamed { from: String },
    /// One already carried the configured name and was taken over.
    Adopted,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceReport {
    pub role: Outcome,
    pub group: Outcome,
    pub role_id: Uuid,
    pub group_id: Uuid,
    pub writes: usize,
}

/// Where the admin role or group ended up.
struct Target {
    id: Uuid,
    outcome: Outcome,
}

pub struct AdminConvergence<S> {
    store: S,
    settings: AdminSettings,
}

impl<S: PermissionStore> AdminConvergence<S> {
    pub fn new(store: S, settings: AdminSettings) -> Self {
        Self { store, settings }
    }

    /// Make `admin_id` a member of the configured role and that role a
    /// member of the configured group. A second run with the same
    /// configuration performs no writes.
    pub async fn converge(&self, admin_id: Uuid) -> TallyResult<ConvergenceReport> {
        let role_name = self.settings.role_name.trim();
        let group_name = self.settings.group_name.trim();
        if role_name.is_empty() || group_name.is_empty() {
            return Err(TallyError::validation("admin role and group names are required"));
        }

        let stored = self.store.get_admin_binding().await?;
        let previous = match &stored {
            Some(binding) => Some((binding.role_name.clone(), binding.group_name.clone())),
            None => self.legacy_names()?,
        };
        let (prev_role, prev_group) = match &previous {
            Some((role, group)) => (non_empty(role), non_empty(group)),
            None => (None, None),
        };

        let store = &self.store;
        let mut tx = store.begin();

        let role = self.converge_role(&mut tx, role_name, prev_role, admin_id).await?;
        let group = self
            .converge_group(&mut tx, group_name, prev_group, role.id)
            .await?;

        let binding_changed = stored
            .as_ref()
            .is_none_or(|b| b.role_name != role_name || b.group_name != group_name);
        if binding_changed {
            let version = stored.as_ref().map(|b| b.version + 1).unwrap_or(1);
            store.stage_put_admin_binding(
                &mut tx,
                &AdminBinding {
                    role_name: role_name.to_string(),
                    group_name: group_name.to_string(),
                    version,
                },
            );
        }

        let writes = store.commit(tx).await?;
        info!(
            role = ?role.outcome,
            group = ?group.outcome,
            writes,
            "admin role and group converged"
        );

        if binding_changed {
            self.mirror_legacy(role_name, group_name);
        }

        Ok(ConvergenceReport {
            role: role.outcome,
            group: group.outcome,
            role_id: role.id,
            group_id: group.id,
            writes,
        })
    }

    async fn converge_role(
        &self,
        tx: &mut S::Tx,
        name: &str,
        previous: Option<&str>,
        admin_id: Uuid,
    ) -> TallyResult<Target> {
        let store = &self.store;

        let (role, outcome) = match store.find_role_by_name(name).await? {
            Some(role) => {
                let outcome = if previous == Some(name) {
                    Outcome::Unchanged
                } else {
                    Outcome::Adopted
                };
                (Some(role), outcome)
            }
            None => match previous {
                Some(prev) => match store.find_role_by_name(prev).await? {
                    Some(role) => {
                        store.stage_rename_role(tx, role.id, name);
                        (
                            Some(role),
                            Outcome::Renamed {
                                from: prev.to_string(),
                            },
                        )
                    }
                    None => (None, Outcome::Recreated),
                },
                None => (None, Outcome::Created),
            },
        };

        let Some(role) = role else {
            let id = Uuid::new_v4();
            store.stage_create_role(tx, id, name);
            store.stage_add_role_members(tx, id, &[admin_id]);
            return Ok(Target { id, outcome });
        };

        let current: BTreeSet<Uuid> = role.member_ids().collect();
        let mut desired = current.clone();
        desired.insert(admin_id);
        stage_diff(
            tx,
            &current,
            &desired,
            |tx, add| store.stage_add_role_members(tx, role.id, add),
            |tx, remove| store.stage_remove_role_members(tx, role.id, remove),
        );
        Ok(Target {
            id: role.id,
            outcome,
        })
    }

    async fn converge_group(
        &self,
        tx: &mut S::Tx,
        name: &str,
        previous: Option<&str>,
        role_id: Uuid,
    ) -> TallyResult<Target> {
        let store = &self.store;

        let (group, outcome) = match store.find_group_by_name(name).await? {
            Some(group) => {
                let outcome = if previous == Some(name) {
                    Outcome::Unchanged
                } else {
                    Outcome::Adopted
                };
                (Some(group), outcome)
            }
            None => match previous {
                Some(prev) => match store.find_group_by_name(prev).await? {
                    Some(group) => {
                        store.stage_rename_group(tx, group.id, name);
                        (
                            Some(group),
                            Outcome::Renamed {
                                from: prev.to_string(),
                            },
                        )
                    }
                    None => (None, Outcome::Recreated),
                },
                None => (None, Outcome::Created),
            },
        };

        let Some(group) = group else {
            let id = Uuid::new_v4();
            store.stage_create_group(tx, id, name);
            store.stage_add_group_roles(tx, id, &[role_id]);
            return Ok(Target { id, outcome });
        };

        let current: BTreeSet<Uuid> = group.role_ids().collect();
        let mut desired = current.clone();
        desired.insert(role_id);
        stage_diff(
            tx,
            &current,
            &desired,
            |tx, add| store.stage_add_group_roles(tx, group.id, add),
            |tx, remove| store.stage_remove_group_roles(tx, group.id, remove),
        );
        Ok(Target {
            id: group.id,
            outcome,
        })
    }

    /// Names from the legacy file, used only while the store has no binding.
    fn legacy_names(&self) -> TallyResult<Option<(String, String)>> {
        let Some(path) = self.settings.legacy_cache_path.as_deref() else {
            return Ok(None);
        };
        let cache = AdminNameCache::load(path).map_err(|e| TallyError::Internal(e.to_string()))?;
        match cache {
            Some(cache) if !cache.is_empty() => {
                info!(path = %path.display(), "seeding admin binding from legacy cache");
                Ok(Some((cache.role_name, cache.group_name)))
            }
            _ => Ok(None),
        }
    }

    fn mirror_legacy(&self, role_name: &str, group_name: &str) {
        let Some(path) = self.settings.legacy_cache_path.as_deref() else {
            return;
        };
        let cache = AdminNameCache {
            group_name: group_name.to_string(),
            role_name: role_name.to_string(),
        };
        if let Err(e) = cache.save(path) {
            warn!(error = %e, "failed to mirror admin names to legacy cache");
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}
