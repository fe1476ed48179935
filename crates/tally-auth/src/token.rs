//! RS256 signing and verification of access and refresh tokens.
//!
//! [`TokenCodec`] is built once at startup from the private key and shared
//! behind an `Arc`. It holds no mutable state, so tests construct their own
//! codecs from throwaway keys.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::RsaPrivateKey;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::pkcs8::DecodePrivateKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tally_core::models::identity::Identity;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Accepted header algorithms. Anything outside the RSA family is rejected.
const RSA_FAMILY: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// The identity fields copied into every access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    pub uuid: Uuid,
    pub name: String,
    pub second_name: String,
    pub patronymic: String,
    /// Unix timestamp of the previous sign-in, 0 if none.
    pub last_login: i64,
}

impl From<&Identity> for IdentitySnapshot {
    fn from(identity: &Identity) -> Self {
        Self {
            uuid: identity.id,
            name: identity.name.clone(),
            second_name: identity.second_name.clone(),
            patronymic: identity.patronymic.clone(),
            last_login: identity.last_login.map(|t| t.timestamp()).unwrap_or(0),
        }
    }
}

/// Claims of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user: IdentitySnapshot,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, serde_json::Value>,
    pub is_admin: bool,
    pub iss: String,
    /// Subject email.
    pub sub: String,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    /// Token id. A token without one is refused even when correctly signed.
    #[serde(default)]
    pub jti: String,
}

/// Claims of a refresh token. The admin flag is deliberately absent and
/// re-derived when the token is exchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub iss: String,
    pub sub: String,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    #[serde(default)]
    pub jti: String,
    pub user_uuid: Uuid,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, serde_json::Value>,
}

trait TokenId {
    fn jti(&self) -> &str;
}

impl TokenId for AccessClaims {
    fn jti(&self) -> &str {
        &self.jti
    }
}

impl TokenId for RefreshClaims {
    fn jti(&self) -> &str {
        &self.jti
    }
}

/// A freshly issued access/refresh pair sharing one token id.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    public_pem: String,
    issuer: String,
    access_ttl: i64,
    refresh_ttl: i64,
    refresh_leeway: u64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

fn lifetime(kind: &str, secs: u64) -> Result<i64, AuthError> {
    i64::try_from(secs)
        .map_err(|_| AuthError::Crypto(format!("{kind} token lifetime {secs}s is out of range")))
}

fn expiry(now: i64, ttl: i64) -> Result<i64, AuthError> {
    now.checked_add(ttl)
        .ok_or_else(|| AuthError::Crypto("token expiry overflows".into()))
}

impl TokenCodec {
    /// Build a codec from a PEM-encoded RSA private key (PKCS#1 or PKCS#8).
    pub fn from_private_pem(pem: &str, config: &AuthConfig) -> Result<Self, AuthError> {
        let private = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;
        let public_pem = private
            .to_public_key()
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| AuthError::Crypto(format!("public key export: {e}")))?;

        let encoding = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;

        Ok(Self {
            encoding,
            decoding,
            public_pem,
            issuer: config.jwt_issuer.clone(),
            access_ttl: lifetime("access", config.access_token_lifetime_secs)?,
            refresh_ttl: lifetime("refresh", config.refresh_token_lifetime_secs)?,
            refresh_leeway: config.refresh_leeway_secs,
        })
    }

    pub fn from_key_file(path: &Path, config: &AuthConfig) -> Result<Self, AuthError> {
        let pem = std::fs::read_to_string(path)
            .map_err(|e| AuthError::Crypto(format!("read {}: {e}", path.display())))?;
        Self::from_private_pem(&pem, config)
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// PKCS#1 PEM of the verification key.
    pub fn public_key_pem(&self) -> &str {
        &self.public_pem
    }

    /// Sign arbitrary claims with RS256.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }

    /// Issue an access and a refresh token for `identity`.
    pub fn issue_pair(&self, identity: &Identity, is_admin: bool) -> Result<TokenPair, AuthError> {
        let now = Utc::now().timestamp();
        let jti = Uuid::new_v4().to_string();

        let access = AccessClaims {
            user: IdentitySnapshot::from(identity),
            data: BTreeMap::new(),
            is_admin,
            iss: self.issuer.clone(),
            sub: identity.email.clone(),
            exp: expiry(now, self.access_ttl)?,
            nbf: now,
            iat: now,
            jti: jti.clone(),
        };
        let refresh = RefreshClaims {
            iss: self.issuer.clone(),
            sub: identity.email.clone(),
            exp: expiry(now, self.refresh_ttl)?,
            nbf: now,
            iat: now,
            jti,
            user_uuid: identity.id,
            data: BTreeMap::new(),
        };

        Ok(TokenPair {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
            expires_in: self.access_ttl.unsigned_abs(),
        })
    }

    /// Verify an access token with no clock leeway.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        self.verify(token, 0)
    }

    /// Verify a refresh token, tolerating a few seconds of clock skew.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        self.verify(token, self.refresh_leeway)
    }

    fn verify<T: DeserializeOwned + TokenId>(&self, token: &str, leeway: u64) -> Result<T, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = RSA_FAMILY.to_vec();
        validation.leeway = leeway;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        let claims = jsonwebtoken::decode::<T>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })?;

        if claims.jti().is_empty() {
            return Err(AuthError::TokenDenied);
        }
        Ok(claims)
    }
}
