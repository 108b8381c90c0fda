// src/db/reset_code_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError, db::repository::ResetCodeRepository,
    models::auth::PasswordResetCode,
};

const RESET_CODE_COLUMNS: &str =
    "id, user_id, code_hash, created_at, expires_at, consumed_at, failed_attempts";

#[derive(Clone)]
pub struct PgResetCodeRepository {
    pool: PgPool,
}

impl PgResetCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetCodeRepository for PgResetCodeRepository {
    async fn replace(
        &self,
        user_id: Uuid,
        code_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetCode, AppError> {
        let mut tx = self.pool.begin().await?;

        // Só o código mais novo vale; os anteriores, usados ou não, somem.
        sqlx::query("DELETE FROM password_reset_codes WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "INSERT INTO password_reset_codes (id, user_id, code_hash, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {RESET_CODE_COLUMNS}"
        );
        let code = sqlx::query_as::<_, PasswordResetCode>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(code_hash)
            .bind(created_at)
            .bind(expires_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::from_db)?;

        tx.commit().await?;
        Ok(code)
    }

    async fn find_active(&self, user_id: Uuid) -> Result<Option<PasswordResetCode>, AppError> {
        let sql = format!(
            "SELECT {RESET_CODE_COLUMNS} FROM password_reset_codes
             WHERE user_id = $1 AND consumed_at IS NULL
             ORDER BY created_at DESC
             LIMIT 1"
        );
        let code = sqlx::query_as::<_, PasswordResetCode>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(code)
    }

    async fn record_failure(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE password_reset_codes SET failed_attempts = failed_attempts + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AppError> {
        // Update condicional: dois pedidos simultâneos com o mesmo código,
        // só um vence.
        let result = sqlx::query(
            "UPDATE password_reset_codes SET consumed_at = $2
             WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
