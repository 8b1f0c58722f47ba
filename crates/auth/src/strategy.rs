//! Authentication strategy resolver.
//!
//! Exactly one strategy runs per call, picked by [`AuthMode`]. Strategies
//! never fall through to one another; a caller that wants a fallback retries
//! explicitly with a different mode.
//!
//! Every failure is reported to the caller as the same generic outcome. The
//! machine-readable [`FailureReason`] is logged and kept crate-private.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use hrpay_core::TenantId;

use crate::config::{AuthConfig, DirectorySettings, LocalTableSettings};
use crate::error::StoreError;
use crate::identity::{UserIdentity, UserKey};
use crate::password::HashScheme;

/// Separator between domain and user name in a qualified login identifier.
pub const DOMAIN_SEPARATOR: char = '\\';

const GENERIC_FAILURE: &str = "invalid credentials";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Bind against a corporate directory.
    Directory,
    /// Users table with stored password hashes.
    #[default]
    LocalTable,
    /// Hosted accounts looked up by email.
    Federated,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Directory => "directory",
            AuthMode::LocalTable => "local_table",
            AuthMode::Federated => "federated",
        }
    }
}

impl core::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "directory" | "ad" | "ldap" => Ok(AuthMode::Directory),
            "local" | "local_table" => Ok(AuthMode::LocalTable),
            "federated" | "saas" => Ok(AuthMode::Federated),
            other => Err(format!("unknown auth mode '{other}'")),
        }
    }
}

/// Split `DOMAIN\user` into its parts. Unqualified identifiers yield no domain.
pub fn split_domain(identifier: &str) -> (Option<&str>, &str) {
    match identifier.split_once(DOMAIN_SEPARATOR) {
        Some((domain, user)) => {
            let domain = domain.trim();
            ((!domain.is_empty()).then_some(domain), user.trim())
        }
        None => (None, identifier.trim()),
    }
}

/// Login request as received from the transport.
#[derive(Clone, Deserialize)]
pub struct LoginInput {
    pub identifier: String,
    pub secret: String,
    #[serde(default)]
    pub domain: Option<String>,
}

impl LoginInput {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

impl core::fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginInput")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

/// Why an authentication attempt failed. Logged, never returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    NotFound,
    BadPassword,
    Inactive,
    Locked,
    Expired,
    EmailUnconfirmed,
    DirectoryUnreachable,
    Timeout,
    StoreUnavailable,
    NotConfigured,
    MissingInput,
}

impl FailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::NotFound => "not_found",
            FailureReason::BadPassword => "bad_password",
            FailureReason::Inactive => "inactive",
            FailureReason::Locked => "locked",
            FailureReason::Expired => "expired",
            FailureReason::EmailUnconfirmed => "email_unconfirmed",
            FailureReason::DirectoryUnreachable => "directory_unreachable",
            FailureReason::Timeout => "timeout",
            FailureReason::StoreUnavailable => "store_unavailable",
            FailureReason::NotConfigured => "not_configured",
            FailureReason::MissingInput => "missing_input",
        }
    }
}

/// Result of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub success: bool,
    pub identity: Option<UserIdentity>,
    pub provider: AuthMode,
    /// Generic, caller-safe message on failure.
    pub error: Option<String>,
    pub(crate) reason: Option<FailureReason>,
}

impl AuthOutcome {
    fn succeeded(identity: UserIdentity) -> Self {
        Self {
            success: true,
            provider: identity.provider,
            identity: Some(identity),
            error: None,
            reason: None,
        }
    }

    fn failed(provider: AuthMode, reason: FailureReason) -> Self {
        Self {
            success: false,
            identity: None,
            provider,
            error: Some(GENERIC_FAILURE.to_string()),
            reason: Some(reason),
        }
    }

    pub fn user_key(&self) -> Option<&UserKey> {
        self.identity.as_ref().map(|i| &i.user_key)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.display_name.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Strategy backends
// ─────────────────────────────────────────────────────────────────────────────

/// Row of the legacy users table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalUserRecord {
    pub code: String,
    pub display_name: String,
    pub password_hash: String,
    pub failed_attempts: u32,
    pub locked: bool,
    pub tenant_id: Option<TenantId>,
}

#[async_trait]
pub trait LocalUserStore: Send + Sync {
    /// Active user whose code matches `code` (trimmed, case-insensitive).
    async fn find_active_by_code(&self, code: &str) -> Result<Option<LocalUserRecord>, StoreError>;

    /// Count one failed attempt, locking the account when `lock` is set.
    async fn record_failed_attempt(&self, code: &str, lock: bool) -> Result<(), StoreError>;

    async fn reset_failed_attempts(&self, code: &str) -> Result<(), StoreError>;
}

/// Hosted account keyed by email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedAccount {
    pub email: String,
    pub user_key: String,
    pub display_name: String,
    pub password_hash: String,
    pub email_confirmed: bool,
    pub active: bool,
    pub tenant_id: Option<TenantId>,
}

#[async_trait]
pub trait FederatedUserStore: Send + Sync {
    /// Lookup by email already passed through [`normalize_email`].
    async fn find_by_normalized_email(&self, email: &str) -> Result<Option<FederatedAccount>, StoreError>;
}

/// Account attributes returned by a successful directory bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub account_name: String,
    pub display_name: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryFailure {
    #[error("no such principal")]
    NotFound,
    #[error("bad password")]
    BadPassword,
    #[error("account locked")]
    Locked,
    #[error("password expired")]
    PasswordExpired,
    #[error("account disabled")]
    Disabled,
    #[error("directory unreachable: {0}")]
    Unreachable(String),
}

impl DirectoryFailure {
    fn reason(&self) -> FailureReason {
        match self {
            DirectoryFailure::NotFound => FailureReason::NotFound,
            DirectoryFailure::BadPassword => FailureReason::BadPassword,
            DirectoryFailure::Locked => FailureReason::Locked,
            DirectoryFailure::PasswordExpired => FailureReason::Expired,
            DirectoryFailure::Disabled => FailureReason::Inactive,
            DirectoryFailure::Unreachable(_) => FailureReason::DirectoryUnreachable,
        }
    }
}

#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// Bind as `principal` (`DOMAIN\user`) with `password`.
    async fn bind(&self, principal: &str, password: &str) -> Result<DirectoryEntry, DirectoryFailure>;
}

#[async_trait]
impl<S: LocalUserStore + ?Sized> LocalUserStore for Arc<S> {
    async fn find_active_by_code(&self, code: &str) -> Result<Option<LocalUserRecord>, StoreError> {
        (**self).find_active_by_code(code).await
    }

    async fn record_failed_attempt(&self, code: &str, lock: bool) -> Result<(), StoreError> {
        (**self).record_failed_attempt(code, lock).await
    }

    async fn reset_failed_attempts(&self, code: &str) -> Result<(), StoreError> {
        (**self).reset_failed_attempts(code).await
    }
}

#[async_trait]
impl<S: FederatedUserStore + ?Sized> FederatedUserStore for Arc<S> {
    async fn find_by_normalized_email(&self, email: &str) -> Result<Option<FederatedAccount>, StoreError> {
        (**self).find_by_normalized_email(email).await
    }
}

/// Case-folded, trimmed email used as the federated lookup key.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct StrategyResolver {
    directory: Option<Arc<dyn DirectoryProvider>>,
    local: Option<Arc<dyn LocalUserStore>>,
    federated: Option<Arc<dyn FederatedUserStore>>,
    directory_settings: DirectorySettings,
    local_settings: LocalTableSettings,
}

impl core::fmt::Debug for StrategyResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StrategyResolver")
            .field("directory", &self.directory.is_some())
            .field("local", &self.local.is_some())
            .field("federated", &self.federated.is_some())
            .field("directory_settings", &self.directory_settings)
            .field("local_settings", &self.local_settings)
            .finish()
    }
}

impl StrategyResolver {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            directory_settings: config.directory.clone(),
            local_settings: config.local.clone(),
            ..Default::default()
        }
    }

    pub fn with_directory(mut self, provider: Arc<dyn DirectoryProvider>) -> Self {
        self.directory = Some(provider);
        self
    }

    pub fn with_local_table(mut self, store: Arc<dyn LocalUserStore>) -> Self {
        self.local = Some(store);
        self
    }

    pub fn with_federated(mut self, store: Arc<dyn FederatedUserStore>) -> Self {
        self.federated = Some(store);
        self
    }

    pub async fn authenticate(&self, input: &LoginInput, mode: AuthMode) -> AuthOutcome {
        let outcome = if input.identifier.trim().is_empty() || input.secret.is_empty() {
            AuthOutcome::failed(mode, FailureReason::MissingInput)
        } else {
            match mode {
                AuthMode::Directory => self.directory_login(input).await,
                AuthMode::LocalTable => self.local_login(input).await,
                AuthMode::Federated => self.federated_login(input).await,
            }
        };

        match (&outcome.identity, outcome.reason) {
            (Some(identity), _) => debug!(mode = %mode, user = %identity.user_key, "authenticated"),
            (None, Some(reason)) => warn!(
                mode = %mode,
                user = %input.identifier.trim(),
                reason = reason.code(),
                "authentication failed"
            ),
            (None, None) => {}
        }
        outcome
    }

    async fn directory_login(&self, input: &LoginInput) -> AuthOutcome {
        let mode = AuthMode::Directory;
        let Some(provider) = &self.directory else {
            return AuthOutcome::failed(mode, FailureReason::NotConfigured);
        };

        let (parsed_domain, username) = split_domain(&input.identifier);
        let domain = input
            .domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .or(parsed_domain)
            .or(self.directory_settings.default_domain.as_deref());
        let principal = match domain {
            Some(domain) => format!("{domain}{DOMAIN_SEPARATOR}{username}"),
            None => username.to_string(),
        };

        let bound = tokio::time::timeout(
            self.directory_settings.timeout(),
            provider.bind(&principal, &input.secret),
        )
        .await;

        let entry = match bound {
            Err(_) => return AuthOutcome::failed(mode, FailureReason::Timeout),
            Ok(Err(failure)) => {
                if let DirectoryFailure::Unreachable(detail) = &failure {
                    debug!(detail = %detail, "directory bind error");
                }
                return AuthOutcome::failed(mode, failure.reason());
            }
            Ok(Ok(entry)) => entry,
        };

        let account = if entry.account_name.trim().is_empty() {
            username
        } else {
            entry.account_name.as_str()
        };
        match UserKey::new(account) {
            Ok(user_key) => AuthOutcome::succeeded(UserIdentity {
                user_key,
                display_name: entry.display_name,
                active: true,
                tenant_id: None,
                provider: mode,
            }),
            Err(_) => AuthOutcome::failed(mode, FailureReason::MissingInput),
        }
    }

    async fn local_login(&self, input: &LoginInput) -> AuthOutcome {
        let mode = AuthMode::LocalTable;
        let Some(store) = &self.local else {
            return AuthOutcome::failed(mode, FailureReason::NotConfigured);
        };
        let scheme = self.local_settings.hash_scheme;
        let code = input.identifier.trim();

        let record = match store.find_active_by_code(code).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                scheme.verify_dummy(&input.secret);
                return AuthOutcome::failed(mode, FailureReason::NotFound);
            }
            Err(err) => {
                warn!(error = %err, "local user lookup failed");
                return AuthOutcome::failed(mode, FailureReason::StoreUnavailable);
            }
        };

        let threshold = self.local_settings.max_failed_attempts;
        if record.locked || (threshold > 0 && record.failed_attempts >= threshold) {
            scheme.verify_dummy(&input.secret);
            return AuthOutcome::failed(mode, FailureReason::Locked);
        }

        if !scheme.verify(&input.secret, &record.password_hash) {
            let attempts = record.failed_attempts.saturating_add(1);
            let lock = threshold > 0 && attempts >= threshold;
            if let Err(err) = store.record_failed_attempt(&record.code, lock).await {
                warn!(error = %err, "failed to record login attempt");
            }
            return AuthOutcome::failed(mode, FailureReason::BadPassword);
        }

        if record.failed_attempts > 0 {
            if let Err(err) = store.reset_failed_attempts(&record.code).await {
                warn!(error = %err, "failed to reset login attempts");
            }
        }

        match UserKey::new(&record.code) {
            Ok(user_key) => AuthOutcome::succeeded(UserIdentity {
                user_key,
                display_name: record.display_name,
                active: true,
                tenant_id: record.tenant_id,
                provider: mode,
            }),
            Err(_) => AuthOutcome::failed(mode, FailureReason::NotFound),
        }
    }

    async fn federated_login(&self, input: &LoginInput) -> AuthOutcome {
        let mode = AuthMode::Federated;
        let Some(store) = &self.federated else {
            return AuthOutcome::failed(mode, FailureReason::NotConfigured);
        };
        let scheme = HashScheme::Argon2;
        let email = normalize_email(&input.identifier);

        let account = match store.find_by_normalized_email(&email).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                scheme.verify_dummy(&input.secret);
                return AuthOutcome::failed(mode, FailureReason::NotFound);
            }
            Err(err) => {
                warn!(error = %err, "federated account lookup failed");
                return AuthOutcome::failed(mode, FailureReason::StoreUnavailable);
            }
        };

        if !scheme.verify(&input.secret, &account.password_hash) {
            return AuthOutcome::failed(mode, FailureReason::BadPassword);
        }
        if !account.email_confirmed {
            return AuthOutcome::failed(mode, FailureReason::EmailUnconfirmed);
        }
        if !account.active {
            return AuthOutcome::failed(mode, FailureReason::Inactive);
        }

        match UserKey::new(&account.user_key) {
            Ok(user_key) => AuthOutcome::succeeded(UserIdentity {
                user_key,
                display_name: account.display_name,
                active: true,
                tenant_id: account.tenant_id,
                provider: mode,
            }),
            Err(_) => AuthOutcome::failed(mode, FailureReason::NotFound),
        }
    }
}
