//! Role domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named set of identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<RoleMember>,
}

impl Role {
    pub fn member_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.members.iter().map(|m| m.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleMember {
    pub id: Uuid,
    pub name: String,
    pub second_name: String,
    pub patronymic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
}
