//! `hrpay-core`: shared primitives for the HR/payroll workspace.
//!
//! This crate contains **pure** building blocks (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::TenantId;
