//! Tally core: domain types and store contracts shared by every other crate.

pub mod diff;
pub mod error;
pub mod models;
pub mod repository;
pub mod resource_key;

pub use diff::SetDiff;
pub use error::{TallyError, TallyResult};
pub use resource_key::normalize;
