use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hrpay_auth::{GroupGrantRow, GroupMembership, PermissionStore, StoreError, UserKey};

#[derive(Debug, Default)]
struct Tables {
    /// user → memberships
    memberships: HashMap<UserKey, Vec<GroupMembership>>,
    grants: Vec<GroupGrantRow>,
    /// system code (upper-cased) → active flag; unknown systems count as active
    systems: HashMap<String, bool>,
}

impl Tables {
    fn system_active(&self, system: &str) -> bool {
        self.systems
            .get(&system.trim().to_ascii_uppercase())
            .copied()
            .unwrap_or(true)
    }
}

/// In-memory permission tables.
///
/// Intended for tests/dev. `set_unavailable(true)` simulates an outage so
/// callers can exercise the fail-closed paths.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_membership(&self, user: UserKey, membership: GroupMembership) {
        if let Ok(mut tables) = self.tables.write() {
            tables.memberships.entry(user).or_default().push(membership);
        }
    }

    /// Convenience: active, non-expiring membership of `user` in `group`.
    pub fn join_group(&self, user: UserKey, system_code: &str, group_code: &str) {
        self.add_membership(
            user,
            GroupMembership {
                system_code: system_code.to_string(),
                group_code: group_code.to_string(),
                expires_at: None,
                active: true,
                system_active: true,
            },
        );
    }

    pub fn add_grant(&self, system_code: &str, group_code: &str, function_code: &str, action_codes: &str, restriction_code: Option<&str>) {
        if let Ok(mut tables) = self.tables.write() {
            tables.grants.push(GroupGrantRow {
                system_code: system_code.to_string(),
                group_code: group_code.to_string(),
                function_code: function_code.to_string(),
                action_codes: action_codes.to_string(),
                restriction_code: restriction_code.map(str::to_string),
                system_active: true,
            });
        }
    }

    pub fn set_system_active(&self, system_code: &str, active: bool) {
        if let Ok(mut tables) = self.tables.write() {
            tables.systems.insert(system_code.trim().to_ascii_uppercase(), active);
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("permission store offline".into()));
        }
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("permission tables lock poisoned".into()))
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn memberships(&self, user: &UserKey, now: DateTime<Utc>) -> Result<Vec<GroupMembership>, StoreError> {
        let tables = self.read()?;
        let Some(rows) = tables.memberships.get(user) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .map(|m| GroupMembership {
                system_active: m.system_active && tables.system_active(&m.system_code),
                ..m.clone()
            })
            .filter(|m| m.is_effective(now))
            .collect())
    }

    async fn group_grants(&self, memberships: &[GroupMembership]) -> Result<Vec<GroupGrantRow>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .grants
            .iter()
            .filter(|row| {
                memberships.iter().any(|m| {
                    m.system_code.trim().eq_ignore_ascii_case(row.system_code.trim())
                        && m.group_code.trim().eq_ignore_ascii_case(row.group_code.trim())
                })
            })
            .map(|row| GroupGrantRow {
                system_active: tables.system_active(&row.system_code),
                ..row.clone()
            })
            .collect())
    }
}
