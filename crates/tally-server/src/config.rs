//! Server configuration sourced from `TALLY_*` environment variables with an
//! optional YAML override file.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tally_access::AdminSettings;
use tally_auth::AuthConfig;
use tally_db::{DbConfig, DbCredentials};

/// Ten years.
const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub jwt_key_path: PathBuf,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub jwt_issuer: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_role: String,
    pub admin_group: String,
    /// Legacy admin name cache. Empty disables it.
    pub admin_cache_path: Option<PathBuf>,
    pub store_timeout: Duration,
    pub min_password_length: usize,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db", &self.db)
            .field("jwt_key_path", &self.jwt_key_path)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"<redacted>")
            .field("admin_role", &self.admin_role)
            .field("admin_group", &self.admin_group)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ServerConfigOverride {
    bind_addr: Option<String>,
    db_url: Option<String>,
    db_namespace: Option<String>,
    db_database: Option<String>,
    db_user: Option<String>,
    db_password: Option<String>,
    jwt_key_path: Option<PathBuf>,
    access_ttl_secs: Option<u64>,
    refresh_ttl_secs: Option<u64>,
    jwt_issuer: Option<String>,
    admin_email: Option<String>,
    admin_password: Option<String>,
    admin_role: Option<String>,
    admin_group: Option<String>,
    admin_cache_path: Option<String>,
    store_timeout_ms: Option<u64>,
    min_password_length: Option<usize>,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(value) => value.trim().parse().with_context(|| format!("parse {name}")),
        None => Ok(default),
    }
}

fn cache_path(value: String) -> Option<PathBuf> {
    let value = value.trim();
    (!value.is_empty()).then(|| PathBuf::from(value))
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = DbConfig::default();
        let credentials = match (var("TALLY_DB_USER"), var("TALLY_DB_PASSWORD")) {
            (Some(username), Some(password)) => Some(DbCredentials { username, password }),
            (None, None) => None,
            _ => bail!("TALLY_DB_USER and TALLY_DB_PASSWORD must be set together"),
        };

        Ok(Self {
            bind_addr: parsed("TALLY_BIND", SocketAddr::from(([0, 0, 0, 0], 10000)))?,
            db: DbConfig {
                url: var("TALLY_DB_URL").unwrap_or(defaults.url),
                namespace: var("TALLY_DB_NAMESPACE").unwrap_or(defaults.namespace),
                database: var("TALLY_DB_DATABASE").unwrap_or(defaults.database),
                credentials,
            },
            jwt_key_path: var("TALLY_JWT_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./cert/jwtRS256.key")),
            access_ttl_secs: parsed("TALLY_ACCESS_TTL_SECS", 86_400)?,
            refresh_ttl_secs: parsed("TALLY_REFRESH_TTL_SECS", 172_800)?,
            jwt_issuer: var("TALLY_JWT_ISSUER").unwrap_or_else(|| "tally".to_string()),
            admin_email: var("TALLY_ADMIN_EMAIL").unwrap_or_default(),
            admin_password: var("TALLY_ADMIN_PASSWORD").unwrap_or_default(),
            admin_role: var("TALLY_ADMIN_ROLE").unwrap_or_else(|| "admin".to_string()),
            admin_group: var("TALLY_ADMIN_GROUP").unwrap_or_else(|| "administrators".to_string()),
            admin_cache_path: match std::env::var("TALLY_ADMIN_CACHE_PATH") {
                Ok(value) => cache_path(value),
                Err(_) => Some(PathBuf::from("./config/perm.yaml")),
            },
            store_timeout: Duration::from_millis(parsed("TALLY_STORE_TIMEOUT_MS", 3000)?),
            min_password_length: parsed("TALLY_MIN_PASSWORD_LEN", 8)?,
        })
    }

    /// Environment first, then the YAML file named by `TALLY_CONFIG`.
    /// Admin credentials must be present after both are applied.
    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Some(path) = var("TALLY_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read TALLY_CONFIG: {path}"))?;
            let override_cfg: ServerConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse server config yaml")?;
            config.apply(override_cfg)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, o: ServerConfigOverride) -> Result<()> {
        if let Some(value) = o.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = o.db_url {
            self.db.url = value;
        }
        if let Some(value) = o.db_namespace {
            self.db.namespace = value;
        }
        if let Some(value) = o.db_database {
            self.db.database = value;
        }
        match (o.db_user, o.db_password) {
            (Some(username), Some(password)) => {
                self.db.credentials = Some(DbCredentials { username, password });
            }
            (None, None) => {}
            _ => bail!("db_user and db_password must be set together"),
        }
        if let Some(value) = o.jwt_key_path {
            self.jwt_key_path = value;
        }
        if let Some(value) = o.access_ttl_secs {
            self.access_ttl_secs = value;
        }
        if let Some(value) = o.refresh_ttl_secs {
            self.refresh_ttl_secs = value;
        }
        if let Some(value) = o.jwt_issuer {
            self.jwt_issuer = value;
        }
        if let Some(value) = o.admin_email {
            self.admin_email = value;
        }
        if let Some(value) = o.admin_password {
            self.admin_password = value;
        }
        if let Some(value) = o.admin_role {
            self.admin_role = value;
        }
        if let Some(value) = o.admin_group {
            self.admin_group = value;
        }
        if let Some(value) = o.admin_cache_path {
            self.admin_cache_path = cache_path(value);
        }
        if let Some(value) = o.store_timeout_ms {
            self.store_timeout = Duration::from_millis(value);
        }
        if let Some(value) = o.min_password_length {
            self.min_password_length = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.admin_email.trim().is_empty() {
            bail!("TALLY_ADMIN_EMAIL is required");
        }
        if self.admin_password.trim().is_empty() {
            bail!("TALLY_ADMIN_PASSWORD is required");
        }
        for (name, secs) in [
            ("TALLY_ACCESS_TTL_SECS", self.access_ttl_secs),
            ("TALLY_REFRESH_TTL_SECS", self.refresh_ttl_secs),
        ] {
            if secs == 0 || secs > MAX_TOKEN_TTL_SECS {
                bail!("{name} must be between 1 and {MAX_TOKEN_TTL_SECS}");
            }
        }
        Ok(())
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            access_token_lifetime_secs: self.access_ttl_secs,
            refresh_token_lifetime_secs: self.refresh_ttl_secs,
            jwt_issuer: self.jwt_issuer.clone(),
            min_password_length: self.min_password_length,
            admin_group_name: self.admin_group.clone(),
            store_timeout: self.store_timeout,
            ..AuthConfig::default()
        }
    }

    pub fn admin_settings(&self) -> AdminSettings {
        AdminSettings {
            role_name: self.admin_role.clone(),
            group_name: self.admin_group.clone(),
            legacy_cache_path: self.admin_cache_path.clone(),
        }
    }
}
