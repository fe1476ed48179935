//! Resource domain model.
//!
//! A resource is one protected endpoint, keyed by its normalized
//! `"<METHOD> - <path>"` string.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub key: String,
}
