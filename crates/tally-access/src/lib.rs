//! Tally Access: startup reconciliation of the resource registry, the
//! role/group graph editor and admin convergence.

pub mod convergence;
pub mod graph;
pub mod name_cache;
pub mod registry;

pub use convergence::{AdminConvergence, AdminSettings, ConvergenceReport, Outcome};
pub use graph::{GroupInput, RoleGroupGraph, RoleInput, stage_diff};
pub use name_cache::{AdminNameCache, NameCacheError};
pub use registry::{ReconcileReport, ResourceRegistry};
