//! Stored-secret verification for the local-table and federated strategies.

use std::sync::OnceLock;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// How a stored secret was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashScheme {
    /// Argon2 PHC string (`$argon2id$...`).
    #[default]
    Argon2,
    /// Legacy unsalted SHA-256, hex encoded.
    Sha256,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl core::str::FromStr for HashScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "argon2" | "argon2id" => Ok(HashScheme::Argon2),
            "sha256" | "sha-256" => Ok(HashScheme::Sha256),
            other => Err(format!("unknown hash scheme '{other}'")),
        }
    }
}

impl HashScheme {
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        match self {
            HashScheme::Argon2 => {
                let mut salt = [0u8; 16];
                rand::thread_rng().fill_bytes(&mut salt);
                let salt = SaltString::encode_b64(&salt).map_err(|e| PasswordError::Hash(e.to_string()))?;
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| PasswordError::Hash(e.to_string()))
            }
            HashScheme::Sha256 => Ok(sha256_hex(password)),
        }
    }

    /// Check `password` against a stored secret. Malformed stored values never verify.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        match self {
            HashScheme::Argon2 => match PasswordHash::new(stored.trim()) {
                Ok(parsed) => Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok(),
                Err(_) => false,
            },
            HashScheme::Sha256 => {
                let expected = stored.trim().to_ascii_lowercase();
                constant_time_eq(sha256_hex(password).as_bytes(), expected.as_bytes())
            }
        }
    }

    /// Spend roughly the cost of a real verification when no user row exists,
    /// so "not found" and "wrong password" take comparable time.
    pub fn verify_dummy(&self, password: &str) {
        static DUMMY_ARGON2: OnceLock<String> = OnceLock::new();
        let stored = match self {
            HashScheme::Argon2 => DUMMY_ARGON2
                .get_or_init(|| HashScheme::Argon2.hash("dummy-password").unwrap_or_default())
                .as_str(),
            HashScheme::Sha256 => "",
        };
        let _ = self.verify(password, stored);
    }
}

fn sha256_hex(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon2_hash_verifies_only_the_right_password() {
        let stored = HashScheme::Argon2.hash("s3cret").unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(HashScheme::Argon2.verify("s3cret", &stored));
        assert!(!HashScheme::Argon2.verify("S3cret", &stored));
    }

    #[test]
    fn argon2_hashes_are_salted() {
        let a = HashScheme::Argon2.hash("same").unwrap();
        let b = HashScheme::Argon2.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn sha256_matches_legacy_hex_digest_case_insensitively() {
        let stored = "2BB80D537B1DA3E38BD30361AA855686BDE0EACD7162FEF6A25FE97BF527A25B";
        assert!(HashScheme::Sha256.verify("secret", stored));
        assert!(HashScheme::Sha256.verify("secret", &stored.to_lowercase()));
        assert!(!HashScheme::Sha256.verify("Secret", stored));
    }

    #[test]
    fn malformed_stored_values_never_verify() {
        assert!(!HashScheme::Argon2.verify("x", "not-a-phc-string"));
        assert!(!HashScheme::Argon2.verify("", ""));
        assert!(!HashScheme::Sha256.verify("x", "abc"));
    }

    #[test]
    fn scheme_parses_from_config_strings() {
        assert_eq!("argon2".parse::<HashScheme>(), Ok(HashScheme::Argon2));
        assert_eq!("SHA256".parse::<HashScheme>(), Ok(HashScheme::Sha256));
        assert!("md5".parse::<HashScheme>().is_err());
    }
}
