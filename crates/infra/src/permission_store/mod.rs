//! Adapters behind the engine's [`PermissionStore`](hrpay_auth::PermissionStore) seam.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryPermissionStore;
pub use postgres::PostgresPermissionStore;
