//! Postgres-backed user stores.
//!
//! | Table | Columns used |
//! |-------|--------------|
//! | `usuario` | `cod_usuario`, `nome`, `senha_hash`, `tentativas_falhas`, `bloqueado`, `ativo`, `tenant_id` |
//! | `conta_federada` | `email`, `email_normalizado`, `cod_usuario`, `nome`, `senha_hash`, `email_confirmado`, `ativo`, `tenant_id` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use hrpay_auth::{FederatedAccount, FederatedUserStore, LocalUserRecord, LocalUserStore, StoreError, TenantId};

use crate::sql::{map_sqlx_error, to_u32};

#[derive(Debug, Clone)]
pub struct PostgresLocalUserStore {
    pool: Arc<PgPool>,
}

impl PostgresLocalUserStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn local_record(row: &PgRow) -> Result<LocalUserRecord, sqlx::Error> {
    let tenant: Option<uuid::Uuid> = row.try_get("tenant_id")?;
    Ok(LocalUserRecord {
        code: row.try_get("cod_usuario")?,
        display_name: row.try_get::<Option<String>, _>("nome")?.unwrap_or_default(),
        password_hash: row.try_get::<Option<String>, _>("senha_hash")?.unwrap_or_default(),
        failed_attempts: to_u32(row.try_get::<Option<i32>, _>("tentativas_falhas")?.unwrap_or(0)),
        locked: row.try_get::<Option<bool>, _>("bloqueado")?.unwrap_or(false),
        tenant_id: tenant.map(TenantId::from_uuid),
    })
}

#[async_trait]
impl LocalUserStore for PostgresLocalUserStore {
    #[instrument(skip(self), err)]
    async fn find_active_by_code(&self, code: &str) -> Result<Option<LocalUserRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                TRIM(cod_usuario) AS cod_usuario,
                nome,
                senha_hash,
                tentativas_falhas,
                bloqueado,
                tenant_id
            FROM usuario
            WHERE UPPER(TRIM(cod_usuario)) = UPPER(TRIM($1))
              AND ativo = TRUE
            "#,
        )
        .bind(code)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_active_by_code", e))?;

        row.as_ref()
            .map(local_record)
            .transpose()
            .map_err(|e| map_sqlx_error("find_active_by_code", e))
    }

    #[instrument(skip(self), err)]
    async fn record_failed_attempt(&self, code: &str, lock: bool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE usuario
            SET tentativas_falhas = COALESCE(tentativas_falhas, 0) + 1,
                bloqueado = COALESCE(bloqueado, FALSE) OR $2
            WHERE UPPER(TRIM(cod_usuario)) = UPPER(TRIM($1))
            "#,
        )
        .bind(code)
        .bind(lock)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_failed_attempt", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn reset_failed_attempts(&self, code: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE usuario
            SET tentativas_falhas = 0
            WHERE UPPER(TRIM(cod_usuario)) = UPPER(TRIM($1))
            "#,
        )
        .bind(code)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("reset_failed_attempts", e))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PostgresFederatedStore {
    pool: Arc<PgPool>,
}

impl PostgresFederatedStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn federated_account(row: &PgRow) -> Result<FederatedAccount, sqlx::Error> {
    let tenant: Option<uuid::Uuid> = row.try_get("tenant_id")?;
    Ok(FederatedAccount {
        email: row.try_get("email")?,
        user_key: row.try_get("cod_usuario")?,
        display_name: row.try_get::<Option<String>, _>("nome")?.unwrap_or_default(),
        password_hash: row.try_get::<Option<String>, _>("senha_hash")?.unwrap_or_default(),
        email_confirmed: row.try_get("email_confirmado")?,
        active: row.try_get("ativo")?,
        tenant_id: tenant.map(TenantId::from_uuid),
    })
}

#[async_trait]
impl FederatedUserStore for PostgresFederatedStore {
    #[instrument(skip(self, email), err)]
    async fn find_by_normalized_email(&self, email: &str) -> Result<Option<FederatedAccount>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                email,
                TRIM(cod_usuario) AS cod_usuario,
                nome,
                senha_hash,
                email_confirmado,
                ativo,
                tenant_id
            FROM conta_federada
            WHERE email_normalizado = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_normalized_email", e))?;

        row.as_ref()
            .map(federated_account)
            .transpose()
            .map_err(|e| map_sqlx_error("find_by_normalized_email", e))
    }
}
