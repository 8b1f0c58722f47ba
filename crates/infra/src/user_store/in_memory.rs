use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use hrpay_auth::{
    FederatedAccount, FederatedUserStore, LocalUserRecord, LocalUserStore, StoreError, UserKey, normalize_email,
};

#[derive(Debug, Clone)]
struct LocalRow {
    record: LocalUserRecord,
    active: bool,
}

/// In-memory users table. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryLocalUserStore {
    rows: RwLock<HashMap<UserKey, LocalRow>>,
    unavailable: AtomicBool,
}

impl InMemoryLocalUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: LocalUserRecord, active: bool) {
        let Ok(key) = UserKey::new(&record.code) else {
            return;
        };
        if let Ok(mut rows) = self.rows.write() {
            rows.insert(key, LocalRow { record, active });
        }
    }

    /// Current row for `code`, active or not.
    pub fn get(&self, code: &str) -> Option<LocalUserRecord> {
        let key = UserKey::new(code).ok()?;
        let rows = self.rows.read().ok()?;
        rows.get(&key).map(|row| row.record.clone())
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("user store offline".into()));
        }
        Ok(())
    }

    fn update(&self, code: &str, apply: impl FnOnce(&mut LocalUserRecord)) -> Result<(), StoreError> {
        self.check_available()?;
        let key = UserKey::new(code).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Unavailable("users lock poisoned".into()))?;
        if let Some(row) = rows.get_mut(&key) {
            apply(&mut row.record);
        }
        Ok(())
    }
}

#[async_trait]
impl LocalUserStore for InMemoryLocalUserStore {
    async fn find_active_by_code(&self, code: &str) -> Result<Option<LocalUserRecord>, StoreError> {
        self.check_available()?;
        let Ok(key) = UserKey::new(code) else {
            return Ok(None);
        };
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Unavailable("users lock poisoned".into()))?;
        Ok(rows
            .get(&key)
            .filter(|row| row.active)
            .map(|row| row.record.clone()))
    }

    async fn record_failed_attempt(&self, code: &str, lock: bool) -> Result<(), StoreError> {
        self.update(code, |record| {
            record.failed_attempts = record.failed_attempts.saturating_add(1);
            record.locked |= lock;
        })
    }

    async fn reset_failed_attempts(&self, code: &str) -> Result<(), StoreError> {
        self.update(code, |record| record.failed_attempts = 0)
    }
}

/// In-memory hosted accounts keyed by normalized email. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryFederatedStore {
    accounts: RwLock<HashMap<String, FederatedAccount>>,
}

impl InMemoryFederatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: FederatedAccount) {
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(normalize_email(&account.email), account);
        }
    }
}

#[async_trait]
impl FederatedUserStore for InMemoryFederatedStore {
    async fn find_by_normalized_email(&self, email: &str) -> Result<Option<FederatedAccount>, StoreError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| StoreError::Unavailable("accounts lock poisoned".into()))?;
        Ok(accounts.get(email).cloned())
    }
}
