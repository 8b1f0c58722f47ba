use chrono::{DateTime, Utc};
use serde::Serialize;

use hrpay_auth::{GroupMembership, PermissionGrant};
use hrpay_core::TenantId;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub auth_mode: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub subject: String,
    pub tenant_id: TenantId,
    pub permissions: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct UserPermissionsResponse {
    pub user_key: String,
    pub groups: Vec<GroupMembership>,
    pub grants: Vec<PermissionGrant>,
    /// Wire form a fresh login would carry.
    pub claims: Vec<String>,
}
