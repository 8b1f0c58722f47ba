//! Store adapters for the authorization engine: in-memory (tests/dev) and
//! Postgres over the legacy HR schema.

pub mod permission_store;
pub mod seed;
pub mod sql;
pub mod user_store;


pub use permission_store::{InMemoryPermissionStore, PostgresPermissionStore};
pub use seed::{InMemoryStores, Seed, SeedError};
pub use user_store::{
    InMemoryFederatedStore, InMemoryLocalUserStore, PostgresFederatedStore, PostgresLocalUserStore, StaticDirectory,
};
