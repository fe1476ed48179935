//! Identity domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub second_name: String,
    pub patronymic: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating an identity. The password arrives already hashed.
#[derive(Debug, Clone)]
pub struct CreateIdentity {
    pub name: String,
    pub second_name: String,
    pub patronymic: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIdentity {
    pub name: Option<String>,
    pub second_name: Option<String>,
    pub patronymic: Option<String>,
}
