//! Per-request authentication and authorization.
//!
//! A request moves through `Unauthenticated -> Authenticated -> Authorized`
//! or ends in `Denied`. Authentication is attempted at most once per
//! request; reaching `Unauthenticated` a second time denies instead of
//! looping. Permission results are never cached between requests.

use std::sync::Arc;
use std::time::Duration;

use tally_core::repository::PermissionQuery;
use tally_core::resource_key;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::token::{AccessClaims, TokenCodec};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("token expired")]
    TokenExpired,

    #[error("token denied")]
    TokenDenied,

    #[error("forbidden")]
    Forbidden,
}

impl From<AuthError> for GateError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired => Self::TokenExpired,
            AuthError::TokenDenied => Self::TokenDenied,
            other => Self::Unauthorized(other.to_string()),
        }
    }
}

/// What the gate needs to know about one request.
#[derive(Debug, Clone, Default)]
pub struct GateRequest<'a> {
    /// Raw `Authorization` header value.
    pub authorization: Option<&'a str>,
    pub method: &'a str,
    /// Matched route template such as `/user/:uuid`, when the router has one.
    pub route_template: Option<&'a str>,
    pub path: &'a str,
    /// Claims already attached by an earlier authenticate stage.
    pub claims: Option<AccessClaims>,
}

#[derive(Debug)]
pub enum GateState {
    Unauthenticated,
    Authenticated(AccessClaims),
    Authorized(AccessClaims),
    Denied(GateError),
}

pub struct AuthorizationGate<P> {
    codec: Arc<TokenCodec>,
    store: P,
    timeout: Duration,
}

impl<P: PermissionQuery> AuthorizationGate<P> {
    pub fn new(codec: Arc<TokenCodec>, store: P, timeout: Duration) -> Self {
        Self {
            codec,
            store,
            timeout,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify a bearer header of exactly two whitespace-separated parts.
    /// The scheme itself is not interpreted.
    pub fn authenticate(&self, header: Option<&str>) -> Result<AccessClaims, GateError> {
        let header = header.ok_or_else(|| GateError::Unauthorized("missing credentials".into()))?;
        let parts: Vec<&str> = header.split_whitespace().collect();
        let [_scheme, token] = parts.as_slice() else {
            return Err(GateError::Unauthorized("malformed authorization header".into()));
        };

        Ok(self.codec.verify_access(token)?)
    }

    /// Run the full pipeline and return the claims of an authorized caller.
    pub async fn authorize(&self, request: GateRequest<'_>) -> Result<AccessClaims, GateError> {
        let mut attempts = 0u8;
        let mut state = match request.claims.clone() {
            Some(claims) => GateState::Authenticated(claims),
            None => GateState::Unauthenticated,
        };

        loop {
            state = match state {
                GateState::Authorized(claims) => return Ok(claims),
                GateState::Denied(err) => return Err(err),
                other => self.step(other, &request, &mut attempts).await,
            };
        }
    }

    async fn step(
        &self,
        state: GateState,
        request: &GateRequest<'_>,
        attempts: &mut u8,
    ) -> GateState {
        match state {
            GateState::Unauthenticated if *attempts > 0 => GateState::Denied(
                GateError::Unauthorized("authentication already attempted".into()),
            ),
            GateState::Unauthenticated => {
                *attempts += 1;
                match self.authenticate(request.authorization) {
                    Ok(claims) => GateState::Authenticated(claims),
                    Err(err) => GateState::Denied(err),
                }
            }
            GateState::Authenticated(claims) => self.check(claims, request).await,
            terminal => terminal,
        }
    }

    async fn check(&self, claims: AccessClaims, request: &GateRequest<'_>) -> GateState {
        if claims.is_admin {
            return GateState::Authorized(claims);
        }

        let template = request.route_template.unwrap_or(request.path);
        let key = resource_key::normalize(request.method, template);
        let identity = claims.user.uuid;

        match tokio::time::timeout(self.timeout, self.store.has_permission(identity, &key)).await {
            Ok(Ok(true)) => {
                debug!(%identity, resource = %key, "access granted");
                GateState::Authorized(claims)
            }
            Ok(Ok(false)) => {
                debug!(%identity, resource = %key, "access refused");
                GateState::Denied(GateError::Forbidden)
            }
            Ok(Err(err)) => {
                warn!(%identity, resource = %key, error = %err, "permission lookup failed");
                GateState::Denied(GateError::Unauthorized("permission lookup failed".into()))
            }
            Err(_) => {
                warn!(%identity, resource = %key, "permission lookup timed out");
                GateState::Denied(GateError::Unauthorized("permission lookup failed".into()))
            }
        }
    }
}
