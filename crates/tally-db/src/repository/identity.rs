//! SurrealDB implementation of [`IdentityRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tally_core::error::TallyResult;
use tally_core::models::identity::{CreateIdentity, Identity, UpdateIdentity};
use tally_core::repository::IdentityRepository;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct IdentityRow {
    name: String,
    second_name: String,
    patronymic: String,
    email: String,
    password_hash: String,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct IdentityRowWithId {
    record_id: String,
    name: String,
    second_name: String,
    patronymic: String,
    email: String,
    password_hash: String,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl IdentityRow {
    fn into_identity(self, id: Uuid) -> Identity {
        Identity {
            id,
            name: self.name,
            second_name: self.second_name,
            patronymic: self.patronymic,
            email: self.email,
            password_hash: self.password_hash,
            last_login: self.last_login,
            created_at: self.created_at,
        }
    }
}

impl IdentityRowWithId {
    fn try_into_identity(self) -> Result<Identity, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(Identity {
            id,
            name: self.name,
            second_name: self.second_name,
            patronymic: self.patronymic,
            email: self.email,
            password_hash: self.password_hash,
            last_login: self.last_login,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the identity repository.
#[derive(Clone)]
pub struct SurrealIdentityRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealIdentityRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> IdentityRepository for SurrealIdentityRepository<C> {
    async fn create(&self, input: CreateIdentity) -> TallyResult<Identity> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 name = $name, second_name = $second_name, \
                 patronymic = $patronymic, email = $email, \
                 password_hash = $password_hash, \
                 last_login = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("second_name", input.second_name))
            .bind(("patronymic", input.patronymic))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_identity(id))
    }

    async fn get_by_id(&self, id: Uuid) -> TallyResult<Identity> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_identity(id))
    }

    async fn get_by_email(&self, email: &str) -> TallyResult<Identity> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM user WHERE email = $email")
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdentityRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("email={email}"),
        })?;

        Ok(row.try_into_identity()?)
    }

    async fn update(&self, id: Uuid, input: UpdateIdentity) -> TallyResult<Identity> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.second_name.is_some() {
            sets.push("second_name = $second_name");
        }
        if input.patronymic.is_some() {
            sets.push("patronymic = $patronymic");
        }
        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        // UPDATE never creates a record, so an empty result means not found.
        let query = format!("UPDATE type::record('user', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(second_name) = input.second_name {
            builder = builder.bind(("second_name", second_name));
        }
        if let Some(patronymic) = input.patronymic {
            builder = builder.bind(("patronymic", patronymic));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_identity(id))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: String) -> TallyResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET password_hash = $password_hash",
            )
            .bind(("id", id_str.clone()))
            .bind(("password_hash", password_hash))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "user".into(),
                id: id_str,
            }
            .into());
        }
        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid) -> TallyResult<()> {
        self.db
            .query("UPDATE type::record('user', $id) SET last_login = time::now()")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;
        Ok(())
    }
}
