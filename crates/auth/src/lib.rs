//! `hrpay-auth`: permission-based authorization engine.
//!
//! Authenticates a user under one strategy, aggregates their effective
//! permissions from the legacy group/function schema, encodes them into a
//! signed credential and evaluates declared permission strings against it.
//!
//! This crate is decoupled from HTTP and storage; stores and the directory
//! are reached through the traits in [`aggregate`] and [`strategy`].

pub mod aggregate;
pub mod authorize;
pub mod claims;
pub mod config;
pub mod error;
pub mod identity;
pub mod password;
pub mod permissions;
pub mod policy;
pub mod service;
pub mod strategy;
pub mod token;

pub use aggregate::{Aggregation, GroupGrantRow, GroupMembership, PermissionAggregator, PermissionStore, merge_grants};
pub use authorize::{authorize, authorize_claims};
pub use claims::{CredentialClaims, TokenFailure, validate_claims};
pub use config::{AuthConfig, DirectorySettings, LocalTableSettings, SigningConfig};
pub use error::{AuthError, StoreError};
pub use identity::{UserIdentity, UserKey};
pub use password::{HashScheme, PasswordError};
pub use permissions::{ActionCodes, PermissionClaim, PermissionGrant, PermissionSet, RestrictionCode, flatten_grants};
pub use policy::{Decision, MalformedRequirement, PermissionRequirement, Requirement, enforce, materialize};
pub use service::{AuthService, LoginResponse};
pub use strategy::{
    AuthMode, AuthOutcome, DirectoryEntry, DirectoryFailure, DirectoryProvider, FailureReason, FederatedAccount,
    FederatedUserStore, LocalUserRecord, LocalUserStore, LoginInput, StrategyResolver, normalize_email, split_domain,
};
pub use token::{CredentialCodec, DecodedCredential, IssuedCredential, VerifiedCredential};

pub use hrpay_core::TenantId;
