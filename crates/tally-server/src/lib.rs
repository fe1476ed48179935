//! Tally Server: HTTP surface of the points backend, with startup
//! reconciliation of resources and the admin role/group.

pub mod api;
pub mod app;
pub mod boot;
pub mod config;
pub mod middleware;
