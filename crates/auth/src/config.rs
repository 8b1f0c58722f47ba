//! Engine configuration.
//!
//! Plain data, deserializable, with defaults suitable for local development.
//! Loading from the process environment lives in the API crate.

use serde::{Deserialize, Serialize};

use hrpay_core::TenantId;

use crate::password::HashScheme;
use crate::strategy::AuthMode;

pub const DEFAULT_ISSUER: &str = "hrpay";
pub const DEFAULT_AUDIENCE: &str = "hrpay-api";
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 3600;
pub const DEFAULT_DIRECTORY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl_secs: u64,
    pub signing: SigningConfig,
    pub mode: AuthMode,
    /// Tenant stamped on credentials when the authenticated identity carries none.
    pub default_tenant: Option<TenantId>,
    pub directory: DirectorySettings,
    pub local: LocalTableSettings,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            signing: SigningConfig::default(),
            mode: AuthMode::LocalTable,
            default_tenant: None,
            directory: DirectorySettings::default(),
            local: LocalTableSettings::default(),
        }
    }
}

impl AuthConfig {
    /// Defaults with a symmetric signing secret.
    pub fn with_hmac_secret(secret: impl Into<String>) -> Self {
        Self {
            signing: SigningConfig {
                hmac_secret: Some(secret.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        let secs = i64::try_from(self.access_token_ttl_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);
        chrono::Duration::seconds(secs)
    }
}

/// Signing key material.
///
/// If both Ed25519 PEMs are present the asymmetric key wins; otherwise the
/// HMAC secret is used. Selection never depends on an environment name.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub hmac_secret: Option<String>,
    pub ed25519_private_pem: Option<String>,
    pub ed25519_public_pem: Option<String>,
}

impl core::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("SigningConfig")
            .field("hmac_secret", &redact(&self.hmac_secret))
            .field("ed25519_private_pem", &redact(&self.ed25519_private_pem))
            .field("ed25519_public_pem", &self.ed25519_public_pem.as_ref().map(|_| "<present>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    /// Domain used when the login identifier is not qualified.
    pub default_domain: Option<String>,
    pub timeout_ms: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            default_domain: None,
            timeout_ms: DEFAULT_DIRECTORY_TIMEOUT_MS,
        }
    }
}

impl DirectorySettings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalTableSettings {
    /// Consecutive failures before the account is locked; `0` disables lockout.
    pub max_failed_attempts: u32,
    pub hash_scheme: HashScheme,
}

impl Default for LocalTableSettings {
    fn default() -> Self {
        Self {
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            hash_scheme: HashScheme::Argon2,
        }
    }
}
