use chrono::{DateTime, Utc};

use hrpay_auth::{PermissionSet, VerifiedCredential};
use hrpay_core::TenantId;

/// Verified credential of the current request.
///
/// Inserted by the auth middleware; handlers and guards receive it
/// explicitly as an extension instead of reading ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialContext {
    subject: String,
    tenant_id: TenantId,
    permission_claims: Vec<String>,
    permissions: PermissionSet,
    expires_at: DateTime<Utc>,
}

impl CredentialContext {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn permission_claims(&self) -> &[String] {
        &self.permission_claims
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl From<VerifiedCredential> for CredentialContext {
    fn from(value: VerifiedCredential) -> Self {
        Self {
            subject: value.subject,
            tenant_id: value.tenant,
            permission_claims: value.permission_claims,
            permissions: value.permissions,
            expires_at: value.expires_at,
        }
    }
}
