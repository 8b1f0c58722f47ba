//! Process configuration sourced from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use hrpay_auth::{AuthConfig, AuthMode, HashScheme};
use hrpay_core::TenantId;

const DEV_JWT_SECRET: &str = "hrpay-dev-secret";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Postgres URL; in-memory stores when absent.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// JSON fixture for the in-memory stores.
    pub seed_file: Option<PathBuf>,
    pub auth: AuthConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = var("HRPAY_BIND")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse HRPAY_BIND")?;
        let database_max_connections = var("HRPAY_DATABASE_MAX_CONNECTIONS")
            .map(|v| v.parse().with_context(|| "parse HRPAY_DATABASE_MAX_CONNECTIONS"))
            .transpose()?
            .unwrap_or(10);

        let mut auth = AuthConfig::default();
        if let Some(issuer) = var("HRPAY_TOKEN_ISSUER") {
            auth.issuer = issuer;
        }
        if let Some(audience) = var("HRPAY_TOKEN_AUDIENCE") {
            auth.audience = audience;
        }
        if let Some(ttl) = var("HRPAY_TOKEN_TTL_SECS") {
            auth.access_token_ttl_secs = ttl.parse().with_context(|| "parse HRPAY_TOKEN_TTL_SECS")?;
        }
        if let Some(mode) = var("HRPAY_AUTH_MODE") {
            auth.mode = mode
                .parse::<AuthMode>()
                .map_err(anyhow::Error::msg)
                .with_context(|| "parse HRPAY_AUTH_MODE")?;
        }
        if let Some(tenant) = var("HRPAY_DEFAULT_TENANT") {
            auth.default_tenant = Some(
                tenant
                    .parse::<TenantId>()
                    .with_context(|| "parse HRPAY_DEFAULT_TENANT")?,
            );
        }

        auth.directory.default_domain = var("HRPAY_DIRECTORY_DOMAIN");
        if let Some(timeout) = var("HRPAY_DIRECTORY_TIMEOUT_MS") {
            auth.directory.timeout_ms = timeout.parse().with_context(|| "parse HRPAY_DIRECTORY_TIMEOUT_MS")?;
        }
        if let Some(max) = var("HRPAY_LOCAL_MAX_FAILED_ATTEMPTS") {
            auth.local.max_failed_attempts = max.parse().with_context(|| "parse HRPAY_LOCAL_MAX_FAILED_ATTEMPTS")?;
        }
        if let Some(scheme) = var("HRPAY_LOCAL_HASH_SCHEME") {
            auth.local.hash_scheme = scheme
                .parse::<HashScheme>()
                .map_err(anyhow::Error::msg)
                .with_context(|| "parse HRPAY_LOCAL_HASH_SCHEME")?;
        }

        let private_key = var("HRPAY_JWT_PRIVATE_KEY_FILE");
        let public_key = var("HRPAY_JWT_PUBLIC_KEY_FILE");
        match (private_key, public_key) {
            (Some(private_path), Some(public_path)) => {
                auth.signing.ed25519_private_pem = Some(
                    std::fs::read_to_string(&private_path)
                        .with_context(|| format!("read HRPAY_JWT_PRIVATE_KEY_FILE: {private_path}"))?,
                );
                auth.signing.ed25519_public_pem = Some(
                    std::fs::read_to_string(&public_path)
                        .with_context(|| format!("read HRPAY_JWT_PUBLIC_KEY_FILE: {public_path}"))?,
                );
            }
            (None, None) => {}
            _ => bail!("HRPAY_JWT_PRIVATE_KEY_FILE and HRPAY_JWT_PUBLIC_KEY_FILE must be set together"),
        }

        auth.signing.hmac_secret = Some(var("HRPAY_JWT_SECRET").unwrap_or_else(|| {
            if auth.signing.ed25519_private_pem.is_none() {
                tracing::warn!("HRPAY_JWT_SECRET not set; using insecure dev default");
            }
            DEV_JWT_SECRET.to_string()
        }));

        Ok(Self {
            bind_addr,
            database_url: var("DATABASE_URL"),
            database_max_connections,
            seed_file: var("HRPAY_SEED_FILE").map(PathBuf::from),
            auth,
        })
    }
}
