// src/db/user_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::UserRepository,
    models::auth::{NewUser, User},
};

const USER_COLUMNS: &str =
    "id, name, email, tax_id, password_hash, phone, created_at, updated_at";

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one_by(&self, column: &str, value: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let maybe_user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    // Erros de chave única viram DuplicateEmail / DuplicateTaxId
    // pelo nome da constraint (ver AppError::from_db).
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (id, name, email, tax_id, password_hash, phone)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.tax_id)
            .bind(&user.password_hash)
            .bind(&user.phone)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from_db)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let maybe_user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_one_by("email", email).await
    }

    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<User>, AppError> {
        self.find_one_by("tax_id", tax_id).await
    }

    async fn update_contact(&self, id: Uuid, phone: &str, tax_id: &str) -> Result<User, AppError> {
        let sql = format!(
            "UPDATE users SET phone = $2, tax_id = $3, updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(phone)
            .bind(tax_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from_db)?
            .ok_or(AppError::NotFound("Usuário"))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Usuário"));
        }
        Ok(())
    }
}
