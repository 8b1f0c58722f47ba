//! Adapters behind the strategy resolver's user-store and directory seams.

pub mod directory;
pub mod in_memory;
pub mod postgres;

pub use directory::StaticDirectory;
pub use in_memory::{InMemoryFederatedStore, InMemoryLocalUserStore};
pub use postgres::{PostgresFederatedStore, PostgresLocalUserStore};
