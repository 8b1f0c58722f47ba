//! Engine construction from process configuration.
//!
//! With `DATABASE_URL` set, users and permissions come from Postgres;
//! otherwise from the in-memory stores, optionally seeded from
//! `HRPAY_SEED_FILE`. The directory provider is only ever seeded.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use hrpay_auth::{AuthConfig, AuthError, AuthMode, AuthService, PermissionStore, StrategyResolver};
use hrpay_infra::{
    InMemoryStores, PostgresFederatedStore, PostgresLocalUserStore, PostgresPermissionStore, Seed, StaticDirectory, sql,
};

use crate::config::ApiConfig;

pub async fn build_service(config: &ApiConfig) -> Result<Arc<AuthService>> {
    let seed = match &config.seed_file {
        Some(path) => {
            Some(Seed::load(path).with_context(|| format!("load seed file {}", path.display()))?)
        }
        None => None,
    };

    let service = match &config.database_url {
        Some(url) => {
            let pool = sql::connect(url, config.database_max_connections)
                .await
                .with_context(|| "connect to DATABASE_URL")?;
            let pool = Arc::new(pool);
            info!(max_connections = config.database_max_connections, "using postgres stores");

            let directory = match seed {
                Some(seed) => seed
                    .into_stores(config.auth.local.hash_scheme)
                    .with_context(|| "build seeded directory")?
                    .directory,
                None => StaticDirectory::new(),
            };
            let resolver = StrategyResolver::new(&config.auth)
                .with_directory(Arc::new(directory))
                .with_local_table(Arc::new(PostgresLocalUserStore::new(pool.clone())))
                .with_federated(Arc::new(PostgresFederatedStore::new(pool.clone())));
            let permissions: Arc<dyn PermissionStore> = Arc::new(PostgresPermissionStore::from_shared(pool));
            AuthService::new(&config.auth, resolver, permissions)?
        }
        None => {
            let stores = seed
                .unwrap_or_default()
                .into_stores(config.auth.local.hash_scheme)
                .with_context(|| "build in-memory stores")?;
            info!(seeded = config.seed_file.is_some(), "using in-memory stores");
            in_memory_service(&config.auth, &stores)?
        }
    };

    if config.auth.mode == AuthMode::Directory && config.seed_file.is_none() {
        warn!("directory mode without seeded accounts: every login will fail");
    }

    Ok(Arc::new(service))
}

/// Engine over in-memory stores; also what the black-box tests run against.
pub fn in_memory_service(auth: &AuthConfig, stores: &InMemoryStores) -> Result<AuthService, AuthError> {
    let resolver = StrategyResolver::new(auth)
        .with_directory(Arc::new(stores.directory.clone()))
        .with_local_table(stores.local_users.clone())
        .with_federated(stores.federated.clone());
    let permissions: Arc<dyn PermissionStore> = stores.permissions.clone();
    AuthService::new(auth, resolver, permissions)
}
