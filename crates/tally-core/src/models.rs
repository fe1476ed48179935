//! Domain models for tally.

pub mod admin_binding;
pub mod group;
pub mod identity;
pub mod resource;
pub mod role;
