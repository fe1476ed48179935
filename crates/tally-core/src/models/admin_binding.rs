//! The last applied administrative role/group names.

use serde::{Deserialize, Serialize};

/// Persisted alongside roles and groups so it is always written in the
/// same transaction as the changes it records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminBinding {
    pub role_name: String,
    pub group_name: String,
    pub version: u64,
}
