//! Fixed directory for tests and local development.
//!
//! Production deployments plug a real directory client in behind
//! [`DirectoryProvider`].

use std::collections::HashMap;

use async_trait::async_trait;

use hrpay_auth::{DirectoryEntry, DirectoryFailure, DirectoryProvider};

#[derive(Debug, Clone)]
enum Account {
    Enabled { password: String, entry: DirectoryEntry },
    Failing(DirectoryFailure),
}

/// Directory with a fixed set of principals (`DOMAIN\user`, case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    accounts: HashMap<String, Account>,
    unreachable: bool,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, principal: &str, password: &str, display_name: &str) -> Self {
        let account_name = principal
            .rsplit_once('\\')
            .map(|(_, user)| user)
            .unwrap_or(principal)
            .to_string();
        self.accounts.insert(
            principal.to_ascii_uppercase(),
            Account::Enabled {
                password: password.to_string(),
                entry: DirectoryEntry {
                    account_name,
                    display_name: display_name.to_string(),
                },
            },
        );
        self
    }

    /// Principal whose bind always fails with `failure` (locked, expired, ...).
    pub fn with_failing_account(mut self, principal: &str, failure: DirectoryFailure) -> Self {
        self.accounts
            .insert(principal.to_ascii_uppercase(), Account::Failing(failure));
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }
}

#[async_trait]
impl DirectoryProvider for StaticDirectory {
    async fn bind(&self, principal: &str, password: &str) -> Result<DirectoryEntry, DirectoryFailure> {
        if self.unreachable {
            return Err(DirectoryFailure::Unreachable("static directory marked unreachable".into()));
        }
        match self.accounts.get(&principal.to_ascii_uppercase()) {
            None => Err(DirectoryFailure::NotFound),
            Some(Account::Failing(failure)) => Err(failure.clone()),
            Some(Account::Enabled { password: expected, entry }) => {
                if expected == password {
                    Ok(entry.clone())
                } else {
                    Err(DirectoryFailure::BadPassword)
                }
            }
        }
    }
}
