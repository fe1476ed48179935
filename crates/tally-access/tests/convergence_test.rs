//! Admin convergence against an in-memory store.

mod common;

use std::path::PathBuf;

use tally_access::convergence::{AdminConvergence, AdminSettings, Outcome};
use tally_access::graph::{GroupInput, RoleGroupGraph, RoleInput};
use tally_access::name_cache::AdminNameCache;
use tally_core::repository::{PermissionQuery, PermissionStore};
use tempfile::tempdir;

fn settings(role: &str, group: &str, cache: Option<PathBuf>) -> AdminSettings {
    AdminSettings {
        role_name: role.into(),
        group_name: group.into(),
        legacy_cache_path: cache,
    }
}

#[tokio::test]
async fn first_run_creates_and_second_run_is_free() {
    let store = common::setup().await;
    let admin = common::identity(&store, "Root").await;
    let convergence = AdminConvergence::new(store.clone(), settings("admin", "administrators", None));

    let first = convergence.converge(admin).await.unwrap();
    assert_eq!(first.role, Outcome::Created);
    assert_eq!(first.group, Outcome::Created);
    assert!(first.writes > 0);

    let role = store.find_role_by_name("admin").await.unwrap().unwrap();
    assert_eq!(role.member_ids().collect::<Vec<_>>(), vec![admin]);
    assert_eq!(
        store.group_names_for(admin).await.unwrap(),
        vec!["administrators"]
    );

    let binding = store.get_admin_binding().await.unwrap().unwrap();
    assert_eq!(binding.role_name, "admin");
    assert_eq!(binding.version, 1);

    let second = convergence.converge(admin).await.unwrap();
    assert_eq!(second.role, Outcome::Unchanged);
    assert_eq!(second.group, Outcome::Unchanged);
    assert_eq!(second.writes, 0);
    assert_eq!(second.role_id, first.role_id);
    assert_eq!(store.list_roles(None).await.unwrap().total, 1);
    assert_eq!(store.list_groups(None).await.unwrap().total, 1);
}

#[tokio::test]
async fn renamed_configuration_renames_in_place() {
    let store = common::setup().await;
    let admin = common::identity(&store, "Root").await;
    let helper = common::identity(&store, "Helper").await;
    let graph = RoleGroupGraph::new(store.clone());

    let first = AdminConvergence::new(store.clone(), settings("admin", "administrators", None))
        .converge(admin)
        .await
        .unwrap();
    graph
        .update_role(
            first.role_id,
            RoleInput {
                name: "admin".into(),
                members: vec![admin, helper],
            },
        )
        .await
        .unwrap();

    let renamed = AdminConvergence::new(store.clone(), settings("superuser", "operators", None))
        .converge(admin)
        .await
        .unwrap();
    assert_eq!(
        renamed.role,
        Outcome::Renamed {
            from: "admin".into()
        }
    );
    assert_eq!(
        renamed.group,
        Outcome::Renamed {
            from: "administrators".into()
        }
    );
    assert_eq!(renamed.role_id, first.role_id);
    assert_eq!(renamed.group_id, first.group_id);

    let role = store.get_role(first.role_id).await.unwrap();
    assert_eq!(role.name, "superuser");
    assert_eq!(role.members.len(), 2);
    assert_eq!(store.list_roles(None).await.unwrap().total, 1);
    assert!(store.find_group_by_name("administrators").await.unwrap().is_none());

    let binding = store.get_admin_binding().await.unwrap().unwrap();
    assert_eq!(binding.role_name, "superuser");
    assert_eq!(binding.group_name, "operators");
    assert_eq!(binding.version, 2);
}

#[tokio::test]
async fn existing_role_with_configured_name_is_adopted() {
    let store = common::setup().await;
    let admin = common::identity(&store, "Root").await;
    let other = common::identity(&store, "Other").await;
    let graph = RoleGroupGraph::new(store.clone());

    let existing = graph
        .create_role(RoleInput {
            name: "admin".into(),
            members: vec![other],
        })
        .await
        .unwrap();

    let report = AdminConvergence::new(store.clone(), settings("admin", "administrators", None))
        .converge(admin)
        .await
        .unwrap();
    assert_eq!(report.role, Outcome::Adopted);
    assert_eq!(report.role_id, existing.id);

    let role = store.get_role(existing.id).await.unwrap();
    assert_eq!(role.members.len(), 2);
}

#[tokio::test]
async fn vanished_role_and_group_are_recreated() {
    let store = common::setup().await;
    let admin = common::identity(&store, "Root").await;
    let graph = RoleGroupGraph::new(store.clone());
    let convergence = AdminConvergence::new(store.clone(), settings("admin", "administrators", None));

    let first = convergence.converge(admin).await.unwrap();
    graph.delete_group(first.group_id).await.unwrap();
    graph.delete_role(first.role_id).await.unwrap();

    let again = convergence.converge(admin).await.unwrap();
    assert_eq!(again.role, Outcome::Recreated);
    assert_eq!(again.group, Outcome::Recreated);
    assert_ne!(again.role_id, first.role_id);
    assert_eq!(
        store.group_names_for(admin).await.unwrap(),
        vec!["administrators"]
    );
    // Names did not change, so the binding is left alone.
    assert_eq!(store.get_admin_binding().await.unwrap().unwrap().version, 1);
}

#[tokio::test]
async fn legacy_cache_seeds_binding_and_is_mirrored() {
    let store = common::setup().await;
    let admin = common::identity(&store, "Root").await;
    let graph = RoleGroupGraph::new(store.clone());
    let dir = tempdir().unwrap();
    let path = dir.path().join("config").join("perm.yaml");

    let role = graph
        .create_role(RoleInput {
            name: "old-admin".into(),
            members: vec![admin],
        })
        .await
        .unwrap();
    graph
        .create_group(GroupInput {
            name: "old-admins".into(),
            roles: vec![role.id],
            resources: vec![],
        })
        .await
        .unwrap();
    AdminNameCache {
        group_name: "old-admins".into(),
        role_name: "old-admin".into(),
    }
    .save(&path)
    .unwrap();

    let report = AdminConvergence::new(
        store.clone(),
        settings("admin", "administrators", Some(path.clone())),
    )
    .converge(admin)
    .await
    .unwrap();
    assert_eq!(
        report.role,
        Outcome::Renamed {
            from: "old-admin".into()
        }
    );
    assert_eq!(report.role_id, role.id);
    assert_eq!(store.list_groups(None).await.unwrap().total, 1);

    let mirrored = AdminNameCache::load(&path).unwrap().unwrap();
    assert_eq!(mirrored.role_name, "admin");
    assert_eq!(mirrored.group_name, "administrators");
    assert!(store.get_admin_binding().await.unwrap().is_some());
}

#[tokio::test]
async fn missing_legacy_file_is_a_first_run() {
    let store = common::setup().await;
    let admin = common::identity(&store, "Root").await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("perm.yaml");

    let report = AdminConvergence::new(
        store.clone(),
        settings("admin", "administrators", Some(path.clone())),
    )
    .converge(admin)
    .await
    .unwrap();
    assert_eq!(report.role, Outcome::Created);
    assert!(path.exists());
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let store = common::setup().await;
    let admin = common::identity(&store, "Root").await;

    let result = AdminConvergence::new(store.clone(), settings(" ", "administrators", None))
        .converge(admin)
        .await;
    assert!(result.is_err());
    assert!(store.get_admin_binding().await.unwrap().is_none());
}
