//! JSON fixtures for the in-memory stores.
//!
//! Lets the API run without a database (local development, black-box tests)
//! with a realistic set of users, groups and grants.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use hrpay_auth::{FederatedAccount, GroupMembership, HashScheme, LocalUserRecord, UserKey};
use hrpay_core::TenantId;

use crate::permission_store::InMemoryPermissionStore;
use crate::user_store::{InMemoryFederatedStore, InMemoryLocalUserStore, StaticDirectory};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid seed document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid seed entry: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Seed {
    pub systems: Vec<SeedSystem>,
    pub users: Vec<SeedUser>,
    pub federated: Vec<SeedFederatedAccount>,
    pub directory: Vec<SeedDirectoryAccount>,
    pub memberships: Vec<SeedMembership>,
    pub grants: Vec<SeedGrant>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSystem {
    pub code: String,
    pub active: bool,
}

/// A local-table user. Exactly one of `password` (hashed on load) or
/// `password_hash` must be present.
#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub code: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
}

#[derive(Debug, Deserialize)]
pub struct SeedFederatedAccount {
    pub email: String,
    pub user_key: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub password: String,
    #[serde(default = "default_true")]
    pub email_confirmed: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
}

#[derive(Debug, Deserialize)]
pub struct SeedDirectoryAccount {
    pub principal: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedMembership {
    pub user: String,
    pub system: String,
    pub group: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SeedGrant {
    pub system: String,
    pub group: String,
    pub function: String,
    pub actions: String,
    #[serde(default)]
    pub restriction: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Stores populated from a [`Seed`].
#[derive(Debug, Clone)]
pub struct InMemoryStores {
    pub permissions: Arc<InMemoryPermissionStore>,
    pub local_users: Arc<InMemoryLocalUserStore>,
    pub federated: Arc<InMemoryFederatedStore>,
    pub directory: StaticDirectory,
}

impl Seed {
    pub fn from_json(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Build in-memory stores; local passwords are hashed with `scheme`.
    pub fn into_stores(self, scheme: HashScheme) -> Result<InMemoryStores, SeedError> {
        let permissions = Arc::new(InMemoryPermissionStore::new());
        let local_users = Arc::new(InMemoryLocalUserStore::new());
        let federated = Arc::new(InMemoryFederatedStore::new());
        let mut directory = StaticDirectory::new();

        for system in self.systems {
            permissions.set_system_active(&system.code, system.active);
        }

        for user in self.users {
            let password_hash = match (user.password, user.password_hash) {
                (Some(password), None) => scheme
                    .hash(&password)
                    .map_err(|e| SeedError::Invalid(e.to_string()))?,
                (None, Some(hash)) => hash,
                _ => {
                    return Err(SeedError::Invalid(format!(
                        "user '{}' needs exactly one of password or password_hash",
                        user.code
                    )));
                }
            };
            local_users.insert(
                LocalUserRecord {
                    display_name: user.display_name.unwrap_or_else(|| user.code.clone()),
                    code: user.code,
                    password_hash,
                    failed_attempts: 0,
                    locked: false,
                    tenant_id: user.tenant_id,
                },
                user.active,
            );
        }

        for account in self.federated {
            let password_hash = HashScheme::Argon2
                .hash(&account.password)
                .map_err(|e| SeedError::Invalid(e.to_string()))?;
            federated.insert(FederatedAccount {
                display_name: account.display_name.unwrap_or_else(|| account.email.clone()),
                email: account.email,
                user_key: account.user_key,
                password_hash,
                email_confirmed: account.email_confirmed,
                active: account.active,
                tenant_id: account.tenant_id,
            });
        }

        for account in self.directory {
            let display_name = account.display_name.unwrap_or_else(|| account.principal.clone());
            directory = directory.with_account(&account.principal, &account.password, &display_name);
        }

        for membership in self.memberships {
            let user = UserKey::new(&membership.user).map_err(|e| SeedError::Invalid(e.to_string()))?;
            permissions.add_membership(
                user,
                GroupMembership {
                    system_code: membership.system,
                    group_code: membership.group,
                    expires_at: membership.expires_at,
                    active: membership.active,
                    system_active: true,
                },
            );
        }

        for grant in self.grants {
            permissions.add_grant(
                &grant.system,
                &grant.group,
                &grant.function,
                &grant.actions,
                grant.restriction.as_deref(),
            );
        }

        Ok(InMemoryStores {
            permissions,
            local_users,
            federated,
            directory,
        })
    }
}
