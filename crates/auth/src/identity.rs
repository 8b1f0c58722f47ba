use serde::{Deserialize, Serialize};

use hrpay_core::{DomainError, DomainResult, TenantId};

use crate::strategy::AuthMode;

/// Canonical key of an authenticated user.
///
/// The original casing is preserved for display and token subjects, but keys
/// are compared case-insensitively after trimming (legacy code columns are
/// fixed-width and inconsistently cased).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserKey(String);

impl UserKey {
    pub fn new(raw: impl AsRef<str>) -> DomainResult<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("user key cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw (possibly padded) key.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl PartialEq for UserKey {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for UserKey {}

impl core::hash::Hash for UserKey {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.0.to_ascii_uppercase().hash(state);
    }
}

impl core::fmt::Display for UserKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A successfully authenticated user.
///
/// Created by the strategy resolver; immutable for the lifetime of a request
/// and never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_key: UserKey,
    pub display_name: String,
    pub active: bool,
    pub tenant_id: Option<TenantId>,
    pub provider: AuthMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_key_trims_but_preserves_case() {
        let key = UserKey::new("  Admin  ").unwrap();
        assert_eq!(key.as_str(), "Admin");
    }

    #[test]
    fn user_key_compares_case_insensitively() {
        let key = UserKey::new("jdoe").unwrap();
        assert!(key.matches("JDOE   "));
        assert_eq!(key, UserKey::new("JDoe").unwrap());
        assert!(!key.matches("jdoe2"));
    }

    #[test]
    fn empty_user_key_is_rejected() {
        assert!(matches!(UserKey::new("   "), Err(DomainError::Validation(_))));
    }
}
