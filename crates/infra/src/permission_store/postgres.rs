//! Postgres-backed permission store over the legacy HR schema.
//!
//! Tables read (codes are fixed-width `CHAR` columns, so every comparison
//! trims; user codes also compare case-insensitively):
//!
//! | Table | Columns used |
//! |-------|--------------|
//! | `sistema` | `cod_sistema`, `ativo` |
//! | `usuario_grupo` | `cod_usuario`, `cod_sistema`, `cod_grupo`, `dt_expiracao`, `ativo` |
//! | `grupo_funcao` | `cod_sistema`, `cod_grupo`, `cod_funcao`, `acoes`, `restricao` |
//!
//! Both queries filter on `sistema.ativo` in SQL; the aggregator re-checks the
//! flag on every row it receives.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};

use hrpay_auth::{GroupGrantRow, GroupMembership, PermissionStore, StoreError, UserKey};

use crate::sql::map_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresPermissionStore {
    pool: Arc<PgPool>,
}

impl PostgresPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub fn from_shared(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionStore for PostgresPermissionStore {
    #[instrument(skip(self, user), fields(user = %user, rows = tracing::field::Empty), err)]
    async fn memberships(&self, user: &UserKey, now: DateTime<Utc>) -> Result<Vec<GroupMembership>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                TRIM(ug.cod_sistema) AS cod_sistema,
                TRIM(ug.cod_grupo)   AS cod_grupo,
                ug.dt_expiracao,
                ug.ativo,
                s.ativo              AS sistema_ativo
            FROM usuario_grupo ug
            JOIN sistema s ON TRIM(s.cod_sistema) = TRIM(ug.cod_sistema)
            WHERE UPPER(TRIM(ug.cod_usuario)) = UPPER($1)
              AND ug.ativo = TRUE
              AND s.ativo = TRUE
              AND (ug.dt_expiracao IS NULL OR ug.dt_expiracao > $2)
            ORDER BY 1, 2
            "#,
        )
        .bind(user.as_str())
        .bind(now)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("memberships", e))?;

        let mut memberships = Vec::with_capacity(rows.len());
        for row in rows {
            memberships.push(GroupMembership {
                system_code: row.try_get("cod_sistema").map_err(|e| map_sqlx_error("memberships", e))?,
                group_code: row.try_get("cod_grupo").map_err(|e| map_sqlx_error("memberships", e))?,
                expires_at: row.try_get("dt_expiracao").map_err(|e| map_sqlx_error("memberships", e))?,
                active: row.try_get("ativo").map_err(|e| map_sqlx_error("memberships", e))?,
                system_active: row.try_get("sistema_ativo").map_err(|e| map_sqlx_error("memberships", e))?,
            });
        }

        Span::current().record("rows", memberships.len());
        Ok(memberships)
    }

    #[instrument(skip(self, memberships), fields(groups = memberships.len(), rows = tracing::field::Empty), err)]
    async fn group_grants(&self, memberships: &[GroupMembership]) -> Result<Vec<GroupGrantRow>, StoreError> {
        if memberships.is_empty() {
            return Ok(Vec::new());
        }
        let systems: Vec<String> = memberships.iter().map(|m| m.system_code.trim().to_string()).collect();
        let groups: Vec<String> = memberships.iter().map(|m| m.group_code.trim().to_string()).collect();

        let rows = sqlx::query(
            r#"
            SELECT
                TRIM(gf.cod_sistema) AS cod_sistema,
                TRIM(gf.cod_grupo)   AS cod_grupo,
                TRIM(gf.cod_funcao)  AS cod_funcao,
                gf.acoes,
                gf.restricao,
                s.ativo              AS sistema_ativo
            FROM grupo_funcao gf
            JOIN sistema s ON TRIM(s.cod_sistema) = TRIM(gf.cod_sistema)
            JOIN UNNEST($1::text[], $2::text[]) AS m(cod_sistema, cod_grupo)
              ON TRIM(gf.cod_sistema) = m.cod_sistema AND TRIM(gf.cod_grupo) = m.cod_grupo
            WHERE s.ativo = TRUE
            ORDER BY 1, 2, 3
            "#,
        )
        .bind(&systems)
        .bind(&groups)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("group_grants", e))?;

        let mut grants = Vec::with_capacity(rows.len());
        for row in rows {
            let actions: Option<String> = row.try_get("acoes").map_err(|e| map_sqlx_error("group_grants", e))?;
            grants.push(GroupGrantRow {
                system_code: row.try_get("cod_sistema").map_err(|e| map_sqlx_error("group_grants", e))?,
                group_code: row.try_get("cod_grupo").map_err(|e| map_sqlx_error("group_grants", e))?,
                function_code: row.try_get("cod_funcao").map_err(|e| map_sqlx_error("group_grants", e))?,
                action_codes: actions.unwrap_or_default(),
                restriction_code: row.try_get("restricao").map_err(|e| map_sqlx_error("group_grants", e))?,
                system_active: row.try_get("sistema_ativo").map_err(|e| map_sqlx_error("group_grants", e))?,
            });
        }

        Span::current().record("rows", grants.len());
        Ok(grants)
    }
}
