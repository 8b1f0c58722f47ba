//! Shared Postgres plumbing.
//!
//! Every sqlx failure surfaces to the engine as `StoreError::Unavailable`:
//! the engine only needs to tell "could not check" apart from "checked".
//! The operation name is kept in the message for logs.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use hrpay_auth::StoreError;

/// Open a pool for the legacy HR database.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Unavailable(format!(
            "database error in {operation} ({}): {}",
            db_err.code().as_deref().unwrap_or("-"),
            db_err.message()
        )),
        sqlx::Error::PoolClosed => StoreError::Unavailable(format!("connection pool closed in {operation}")),
        sqlx::Error::PoolTimedOut => StoreError::Unavailable(format!("connection pool timed out in {operation}")),
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::Unavailable(format!("failed to decode column {index} in {operation}: {source}"))
        }
        other => StoreError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

/// Legacy integer counters are signed; negative values read as zero.
pub(crate) fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_sqlx_error_is_unavailable() {
        let err = map_sqlx_error("memberships", sqlx::Error::PoolClosed);
        assert_eq!(
            err,
            StoreError::Unavailable("connection pool closed in memberships".into())
        );
        assert!(matches!(
            map_sqlx_error("group_grants", sqlx::Error::RowNotFound),
            StoreError::Unavailable(msg) if msg.contains("group_grants")
        ));
    }

    #[test]
    fn negative_counters_clamp_to_zero() {
        assert_eq!(to_u32(-3), 0);
        assert_eq!(to_u32(4), 4);
    }
}
