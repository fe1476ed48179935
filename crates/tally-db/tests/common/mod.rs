//! Shared setup for tally-db integration tests.

#![allow(dead_code)]

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tally_core::models::identity::{CreateIdentity, Identity};
use tally_core::repository::IdentityRepository;
use tally_db::{SurrealIdentityRepository, SurrealPermissionStore};

/// Spin up an in-memory DB with migrations applied.
pub async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tally_db::run_migrations(&db).await.unwrap();
    db
}

pub fn store(db: &Surreal<Db>) -> SurrealPermissionStore<Db> {
    SurrealPermissionStore::new(db.clone())
}

pub async fn identity(db: &Surreal<Db>, name: &str) -> Identity {
    SurrealIdentityRepository::new(db.clone())
        .create(CreateIdentity {
            name: name.into(),
            second_name: "Tester".into(),
            patronymic: String::new(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: "not-a-real-hash".into(),
        })
        .await
        .unwrap()
}
