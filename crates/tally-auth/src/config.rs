//! Authentication configuration.

use std::time::Duration;

/// Configuration for token issuance, password policy and the gate.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Access token lifetime in seconds (default: 86_400 = 1 day).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 172_800 = 2 days).
    pub refresh_token_lifetime_secs: u64,
    /// Clock skew tolerated when verifying refresh tokens.
    pub refresh_leeway_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// Membership in a group with this name makes a token admin.
    pub admin_group_name: String,
    /// Upper bound on one permission lookup during authorization.
    pub store_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime_secs: 86_400,
            refresh_token_lifetime_secs: 172_800,
            refresh_leeway_secs: 5,
            jwt_issuer: "tally".into(),
            pepper: None,
            min_password_length: 8,
            admin_group_name: "administrators".into(),
            store_timeout: Duration::from_secs(3),
        }
    }
}
