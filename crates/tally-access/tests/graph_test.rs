//! Role and group editing against an in-memory store.

mod common;

use std::collections::BTreeSet;

use tally_access::graph::{GroupInput, RoleGroupGraph, RoleInput};
use tally_core::error::TallyError;
use tally_core::repository::{PermissionQuery, PermissionStore};
use uuid::Uuid;

#[tokio::test]
async fn role_members_converge_by_diff() {
    let store = common::setup().await;
    let graph = RoleGroupGraph::new(store.clone());
    let alice = common::identity(&store, "Alice").await;
    let bob = common::identity(&store, "Bob").await;
    let carol = common::identity(&store, "Carol").await;

    let role = graph
        .create_role(RoleInput {
            name: "  staff ".into(),
            members: vec![alice, bob, alice],
        })
        .await
        .unwrap();
    assert_eq!(role.name, "staff");
    assert_eq!(role.members.len(), 2);

    let updated = graph
        .update_role(
            role.id,
            RoleInput {
                name: "crew".into(),
                members: vec![bob, carol],
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "crew");
    let members: BTreeSet<Uuid> = updated.member_ids().collect();
    assert_eq!(members, BTreeSet::from([bob, carol]));

    // Same input again changes nothing.
    let again = graph
        .update_role(
            role.id,
            RoleInput {
                name: "crew".into(),
                members: vec![bob, carol],
            },
        )
        .await
        .unwrap();
    assert_eq!(again.member_ids().collect::<BTreeSet<_>>(), members);
}

#[tokio::test]
async fn diff_and_apply_is_idempotent() {
    let store = common::setup().await;
    let graph = RoleGroupGraph::new(store.clone());
    let alice = common::identity(&store, "Alice").await;
    let bob = common::identity(&store, "Bob").await;

    let role = graph
        .create_role(RoleInput {
            name: "ops".into(),
            members: vec![alice],
        })
        .await
        .unwrap();
    let current: BTreeSet<Uuid> = role.member_ids().collect();
    let desired = BTreeSet::from([alice, bob]);

    let first = graph
        .diff_and_apply(
            &current,
            &desired,
            |s, tx, add| s.stage_add_role_members(tx, role.id, add),
            |s, tx, remove| s.stage_remove_role_members(tx, role.id, remove),
        )
        .await
        .unwrap();
    assert_eq!(first.to_add, vec![bob]);

    let now: BTreeSet<Uuid> = graph.get_role(role.id).await.unwrap().member_ids().collect();
    let second = graph
        .diff_and_apply(
            &now,
            &desired,
            |s, tx, add| s.stage_add_role_members(tx, role.id, add),
            |s, tx, remove| s.stage_remove_role_members(tx, role.id, remove),
        )
        .await
        .unwrap();
    assert!(second.is_empty());

    let cleared = graph
        .diff_and_apply(
            &now,
            &BTreeSet::new(),
            |s, tx, add| s.stage_add_role_members(tx, role.id, add),
            |s, tx, remove| s.stage_remove_role_members(tx, role.id, remove),
        )
        .await
        .unwrap();
    assert_eq!(cleared.to_remove.len(), 2);
    assert!(graph.get_role(role.id).await.unwrap().members.is_empty());
}

#[tokio::test]
async fn role_validation_and_conflicts() {
    let store = common::setup().await;
    let graph = RoleGroupGraph::new(store.clone());

    assert!(matches!(
        graph
            .create_role(RoleInput {
                name: " ".into(),
                members: vec![],
            })
            .await,
        Err(TallyError::Validation { .. })
    ));

    let first = graph
        .create_role(RoleInput {
            name: "ops".into(),
            members: vec![],
        })
        .await
        .unwrap();
    assert!(matches!(
        graph
            .create_role(RoleInput {
                name: "ops".into(),
                members: vec![],
            })
            .await,
        Err(TallyError::AlreadyExists { .. })
    ));

    let second = graph
        .create_role(RoleInput {
            name: "dev".into(),
            members: vec![],
        })
        .await
        .unwrap();
    assert!(matches!(
        graph
            .update_role(
                second.id,
                RoleInput {
                    name: "ops".into(),
                    members: vec![],
                },
            )
            .await,
        Err(TallyError::AlreadyExists { .. })
    ));

    assert!(matches!(
        graph
            .update_role(
                first.id,
                RoleInput {
                    name: "ops".into(),
                    members: vec![Uuid::new_v4()],
                },
            )
            .await,
        Err(TallyError::NotFound { .. })
    ));
    assert!(matches!(
        graph.delete_role(Uuid::new_v4()).await,
        Err(TallyError::NotFound { .. })
    ));
}

#[tokio::test]
async fn group_update_diffs_roles_and_resources() {
    let store = common::setup().await;
    let graph = RoleGroupGraph::new(store.clone());
    let alice = common::identity(&store, "Alice").await;
    let ids = common::resources(
        &store,
        &["GET - /user/:var", "PUT - /user/:var", "GET - /permission/role"],
    )
    .await;
    let (get_user, put_user, list_roles) = (ids[0], ids[1], ids[2]);

    let role = graph
        .create_role(RoleInput {
            name: "editors".into(),
            members: vec![alice],
        })
        .await
        .unwrap();
    let group = graph
        .create_group(GroupInput {
            name: "content".into(),
            roles: vec![role.id],
            resources: vec![get_user, put_user],
        })
        .await
        .unwrap();
    assert!(store.has_permission(alice, "PUT - /user/:var").await.unwrap());

    let updated = graph
        .update_group(
            group.id,
            GroupInput {
                name: "content-team".into(),
                roles: vec![role.id],
                resources: vec![get_user, list_roles],
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "content-team");
    assert_eq!(updated.resources.len(), 2);
    assert!(!store.has_permission(alice, "PUT - /user/:var").await.unwrap());
    assert!(
        store
            .has_permission(alice, "GET - /permission/role")
            .await
            .unwrap()
    );

    assert!(matches!(
        graph
            .update_group(
                group.id,
                GroupInput {
                    name: "content-team".into(),
                    roles: vec![Uuid::new_v4()],
                    resources: vec![],
                },
            )
            .await,
        Err(TallyError::NotFound { .. })
    ));
}

#[tokio::test]
async fn deleting_role_and_group_cascades() {
    let store = common::setup().await;
    let graph = RoleGroupGraph::new(store.clone());
    let alice = common::identity(&store, "Alice").await;
    let res = common::resources(&store, &["DELETE - /permission/role/:var"]).await[0];

    let role = graph
        .create_role(RoleInput {
            name: "cleaners".into(),
            members: vec![alice],
        })
        .await
        .unwrap();
    let group = graph
        .create_group(GroupInput {
            name: "cleanup".into(),
            roles: vec![role.id],
            resources: vec![res],
        })
        .await
        .unwrap();

    graph.delete_role(role.id).await.unwrap();
    assert!(graph.get_group(group.id).await.unwrap().roles.is_empty());
    assert!(
        !store
            .has_permission(alice, "DELETE - /permission/role/:var")
            .await
            .unwrap()
    );

    graph.delete_group(group.id).await.unwrap();
    assert!(matches!(
        graph.get_group(group.id).await,
        Err(TallyError::NotFound { .. })
    ));
    // The resource outlives the group.
    assert_eq!(store.list_resources().await.unwrap().len(), 1);
    assert_eq!(graph.list_groups(None).await.unwrap().total, 0);
}
