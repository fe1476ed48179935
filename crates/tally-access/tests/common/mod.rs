//! Shared setup for tally-access integration tests.

#![allow(dead_code)]

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tally_core::models::identity::CreateIdentity;
use tally_core::repository::{IdentityRepository, PermissionStore};
use tally_db::{SurrealIdentityRepository, SurrealPermissionStore};
use uuid::Uuid;

pub type Store = SurrealPermissionStore<Db>;

pub async fn setup() -> Store {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tally_db::run_migrations(&db).await.unwrap();
    SurrealPermissionStore::new(db)
}

/// Create an identity through the same database the store uses.
pub async fn identity(store: &Store, name: &str) -> Uuid {
    SurrealIdentityRepository::new(store.client().clone())
        .create(CreateIdentity {
            name: name.into(),
            second_name: "Tester".into(),
            patronymic: String::new(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: "not-a-real-hash".into(),
        })
        .await
        .unwrap()
        .id
}

pub async fn resources(store: &Store, keys: &[&str]) -> Vec<Uuid> {
    let mut tx = store.begin();
    let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    store.stage_create_resources(&mut tx, &keys);
    store.commit(tx).await.unwrap();

    let all = store.list_resources().await.unwrap();
    keys.iter()
        .map(|k| all.iter().find(|r| &r.key == k).unwrap().id)
        .collect()
}
