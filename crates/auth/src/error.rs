//! Engine error taxonomy.

use thiserror::Error;

use crate::claims::TokenFailure;

/// Failure of a read against the permission or user store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not answer (connection, query or decode failure).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The caller cancelled the query before it completed.
    #[error("store query cancelled")]
    Cancelled,
}

/// Errors surfaced by the login/credential service.
///
/// Authentication and token failures collapse into `InvalidCredentials` and
/// `TokenInvalid` at the boundary; store failures stay distinguishable so
/// operators can tell an outage apart from a user without grants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Credentials matched a disabled account. The HTTP boundary answers this
    /// exactly like `InvalidCredentials`.
    #[error("account inactive")]
    AccountInactive,

    #[error("permission store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("permission lookup cancelled")]
    Cancelled,

    #[error("invalid token: {0}")]
    TokenInvalid(TokenFailure),

    #[error("credential encoding failed: {0}")]
    Encoding(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
            StoreError::Cancelled => AuthError::Cancelled,
        }
    }
}

impl From<TokenFailure> for AuthError {
    fn from(value: TokenFailure) -> Self {
        AuthError::TokenInvalid(value)
    }
}
