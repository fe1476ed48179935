//! Sign-up, sign-in, refresh and password flows.
//!
//! Passwords are trimmed on every path before policy, hashing and
//! verification, so surrounding whitespace never changes the secret.

use std::sync::Arc;

use chrono::Utc;
use tally_core::error::{TallyError, TallyResult};
use tally_core::models::identity::{CreateIdentity, Identity};
use tally_core::repository::{IdentityRepository, PermissionQuery};
use tracing::info;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token::{TokenCodec, TokenPair};

/// Input for the sign-up flow.
#[derive(Debug, Clone, Default)]
pub struct SignUpInput {
    pub name: String,
    pub second_name: String,
    pub patronymic: String,
    pub email: String,
    pub password: String,
}

/// An identity together with the tokens just issued for it.
#[derive(Debug)]
pub struct AuthOutput {
    pub identity: Identity,
    pub tokens: TokenPair,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer has no
/// dependency on the database crate.
pub struct AuthService<I, P> {
    identities: I,
    permissions: P,
    codec: Arc<TokenCodec>,
    config: AuthConfig,
}

impl<I: IdentityRepository, P: PermissionQuery> AuthService<I, P> {
    pub fn new(identities: I, permissions: P, codec: Arc<TokenCodec>, config: AuthConfig) -> Self {
        Self {
            identities,
            permissions,
            codec,
            config,
        }
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    pub fn identities(&self) -> &I {
        &self.identities
    }

    pub async fn sign_up(&self, input: SignUpInput) -> TallyResult<AuthOutput> {
        let name = input.name.trim();
        let email = input.email.trim().to_lowercase();
        if name.is_empty() {
            return Err(TallyError::validation("name is required"));
        }
        if email.is_empty() {
            return Err(TallyError::validation("email is required"));
        }
        let secret = input.password.trim();
        password::check_policy(secret, self.config.min_password_length)?;

        let password_hash = password::hash_password(secret, self.config.pepper.as_deref())?;
        let identity = self
            .identities
            .create(CreateIdentity {
                name: name.to_string(),
                second_name: input.second_name.trim().to_string(),
                patronymic: input.patronymic.trim().to_string(),
                email,
                password_hash,
            })
            .await?;

        info!(identity = %identity.id, "identity registered");
        // A brand-new identity belongs to no group yet.
        let tokens = self.codec.issue_pair(&identity, false)?;
        Ok(AuthOutput { identity, tokens })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> TallyResult<AuthOutput> {
        let email = email.trim().to_lowercase();
        let password = password.trim();
        if email.is_empty() {
            return Err(TallyError::validation("email is required"));
        }
        if password.is_empty() {
            return Err(TallyError::validation("password is required"));
        }

        let mut identity = match self.identities.get_by_email(&email).await {
            Ok(identity) => identity,
            Err(TallyError::NotFound { .. }) => return Err(AuthError::InvalidCredentials.into()),
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(
            password,
            &identity.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        self.identities.touch_last_login(identity.id).await?;
        identity.last_login = Some(Utc::now());

        let is_admin = self.is_admin(identity.id).await?;
        let tokens = self.codec.issue_pair(&identity, is_admin)?;
        Ok(AuthOutput { identity, tokens })
    }

    /// Exchange a refresh token (optionally prefixed with `Bearer `) for a
    /// new pair. The admin flag is looked up again rather than carried over.
    pub async fn refresh(&self, refresh_token: &str) -> TallyResult<AuthOutput> {
        let raw = refresh_token.trim();
        let raw = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
        if raw.is_empty() {
            return Err(AuthError::TokenDenied.into());
        }

        let claims = self.codec.verify_refresh(raw)?;
        let identity = match self.identities.get_by_id(claims.user_uuid).await {
            Ok(identity) => identity,
            Err(TallyError::NotFound { .. }) => return Err(AuthError::TokenDenied.into()),
            Err(e) => return Err(e),
        };

        let is_admin = self.is_admin(identity.id).await?;
        let tokens = self.codec.issue_pair(&identity, is_admin)?;
        Ok(AuthOutput { identity, tokens })
    }

    pub async fn change_password(&self, identity_id: Uuid, new_password: &str) -> TallyResult<()> {
        let new_password = new_password.trim();
        password::check_policy(new_password, self.config.min_password_length)?;
        let hash = password::hash_password(new_password, self.config.pepper.as_deref())?;
        self.identities.update_password_hash(identity_id, hash).await?;
        info!(identity = %identity_id, "password changed");
        Ok(())
    }

    /// Make sure the configured admin identity exists and that `password`
    /// signs it in. Returns its id.
    pub async fn ensure_admin_identity(&self, email: &str, password: &str) -> TallyResult<Uuid> {
        let email = email.trim().to_lowercase();
        let password = password.trim();
        let existing = match self.identities.get_by_email(&email).await {
            Ok(identity) => Some(identity),
            Err(TallyError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let Some(identity) = existing else {
            let created = self
                .sign_up(SignUpInput {
                    name: "Administrator".into(),
                    second_name: "System".into(),
                    patronymic: String::new(),
                    email,
                    password: password.to_string(),
                })
                .await?;
            info!(identity = %created.identity.id, "admin identity created");
            return Ok(created.identity.id);
        };

        let current = password::verify_password(
            password,
            &identity.password_hash,
            self.config.pepper.as_deref(),
        )
        // An unreadable stored hash is replaced like a stale one.
        .unwrap_or(false);
        if !current {
            self.change_password(identity.id, password).await?;
            info!(identity = %identity.id, "admin password reset from configuration");
        }
        Ok(identity.id)
    }

    async fn is_admin(&self, identity_id: Uuid) -> TallyResult<bool> {
        let groups = self.permissions.group_names_for(identity_id).await?;
        Ok(groups.iter().any(|g| *g == self.config.admin_group_name))
    }
}
