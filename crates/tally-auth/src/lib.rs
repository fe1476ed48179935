//! Tally Auth: token codec, password hashing, the per-request
//! authorization gate and the sign-in flows built on them.

pub mod config;
pub mod error;
pub mod gate;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use gate::{AuthorizationGate, GateError, GateRequest, GateState};
pub use service::{AuthOutput, AuthService, SignUpInput};
pub use token::{AccessClaims, IdentitySnapshot, RefreshClaims, TokenCodec, TokenPair};
