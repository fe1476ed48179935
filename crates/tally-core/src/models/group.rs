//! Group domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::Resource;
use super::role::RoleSummary;

/// The unit of access grant: every member of every attached role may
/// call every attached resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub roles: Vec<RoleSummary>,
    pub resources: Vec<Resource>,
}

impl Group {
    pub fn role_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.roles.iter().map(|r| r.id)
    }

    pub fn resource_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.resources.iter().map(|r| r.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
}
