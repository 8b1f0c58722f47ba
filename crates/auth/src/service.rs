//! Login and authorization façade.
//!
//! `login` runs the configured strategy, aggregates the user's permissions and
//! issues a credential. `authorize` decodes a presented credential and checks
//! it against a declared permission string. Everything is passed explicitly;
//! nothing is read from ambient request state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use hrpay_core::TenantId;

use crate::aggregate::{Aggregation, PermissionAggregator, PermissionStore};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::identity::{UserIdentity, UserKey};
use crate::policy::{Decision, enforce};
use crate::strategy::{AuthMode, FailureReason, LoginInput, StrategyResolver};
use crate::token::{CredentialCodec, DecodedCredential, VerifiedCredential};

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub identity: UserIdentity,
}

pub struct AuthService {
    resolver: StrategyResolver,
    aggregator: PermissionAggregator<Arc<dyn PermissionStore>>,
    codec: CredentialCodec,
    mode: AuthMode,
    default_tenant: Option<TenantId>,
}

impl core::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthService")
            .field("resolver", &self.resolver)
            .field("codec", &self.codec)
            .field("mode", &self.mode)
            .field("default_tenant", &self.default_tenant)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        resolver: StrategyResolver,
        permissions: Arc<dyn PermissionStore>,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            resolver,
            aggregator: PermissionAggregator::new(permissions),
            codec: CredentialCodec::from_config(config)?,
            mode: config.mode,
            default_tenant: config.default_tenant,
        })
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn codec(&self) -> &CredentialCodec {
        &self.codec
    }

    /// Authenticate with the configured mode and issue a credential.
    pub async fn login(&self, input: &LoginInput, cancel: &CancellationToken) -> Result<LoginResponse, AuthError> {
        self.login_with_mode(input, self.mode, cancel).await
    }

    /// Authenticate with an explicit mode. This is the only way to try a
    /// different strategy after a failure.
    #[instrument(skip_all, fields(mode = %mode))]
    pub async fn login_with_mode(
        &self,
        input: &LoginInput,
        mode: AuthMode,
        cancel: &CancellationToken,
    ) -> Result<LoginResponse, AuthError> {
        let outcome = self.resolver.authenticate(input, mode).await;
        let identity = match outcome.identity {
            Some(identity) if outcome.success => identity,
            _ => {
                return Err(match outcome.reason {
                    Some(FailureReason::StoreUnavailable) => {
                        AuthError::StoreUnavailable("user store unavailable".into())
                    }
                    Some(FailureReason::NotConfigured) => {
                        AuthError::Config(format!("auth mode {mode} has no backend"))
                    }
                    Some(FailureReason::Inactive) => AuthError::AccountInactive,
                    _ => AuthError::InvalidCredentials,
                });
            }
        };

        let tenant = identity.tenant_id.or(self.default_tenant).ok_or_else(|| {
            warn!(user = %identity.user_key, "no tenant for authenticated user");
            AuthError::Config("no tenant for authenticated user and no default tenant".into())
        })?;

        let aggregation = self.aggregator.aggregate(&identity.user_key, Utc::now(), cancel).await?;
        let issued = self
            .codec
            .issue(identity.user_key.as_str(), tenant, &aggregation.grants)?;

        debug!(
            user = %identity.user_key,
            claims = issued.permission_claims.len(),
            "credential issued"
        );

        Ok(LoginResponse {
            access_token: issued.token,
            token_type: TOKEN_TYPE,
            expires_at: issued.expires_at,
            identity,
        })
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedCredential, AuthError> {
        Ok(self.codec.verify(token)?)
    }

    pub fn decode(&self, token: &str) -> DecodedCredential {
        self.codec.decode(token)
    }

    /// Check a presented token against a declared permission string.
    /// Invalid tokens deny.
    pub fn authorize(&self, token: &str, declared: &str) -> Decision {
        match self.codec.verify(token) {
            Ok(credential) => enforce(declared, &credential.permissions),
            Err(_) => Decision::Deny,
        }
    }

    /// Current effective permissions of `user`, straight from the store.
    pub async fn permissions_of(&self, user: &UserKey, cancel: &CancellationToken) -> Result<Aggregation, AuthError> {
        Ok(self.aggregator.aggregate(user, Utc::now(), cancel).await?)
    }
}
