// src/db/company_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::CompanyRepository,
    models::company::{Company, NewCompany},
};

const COMPANY_COLUMNS: &str =
    "id, name, email, password_hash, registration_number, created_at";

#[derive(Clone)]
pub struct PgCompanyRepository {
    pool: PgPool,
}

impl PgCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one_by(&self, column: &str, value: &str) -> Result<Option<Company>, AppError> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE {column} = $1");
        let company = sqlx::query_as::<_, Company>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(company)
    }
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn create(&self, company: NewCompany) -> Result<Company, AppError> {
        let sql = format!(
            "INSERT INTO companies (id, name, email, password_hash, registration_number)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COMPANY_COLUMNS}"
        );
        sqlx::query_as::<_, Company>(&sql)
            .bind(Uuid::new_v4())
            .bind(&company.name)
            .bind(&company.email)
            .bind(&company.password_hash)
            .bind(&company.registration_number)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from_db)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, AppError> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1");
        let company = sqlx::query_as::<_, Company>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(company)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Company>, AppError> {
        self.find_one_by("email", email).await
    }

    async fn find_by_registration_number(
        &self,
        registration_number: &str,
    ) -> Result<Option<Company>, AppError> {
        self.find_one_by("registration_number", registration_number).await
    }

    async fn list(&self) -> Result<Vec<Company>, AppError> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies ORDER BY name ASC");
        let companies = sqlx::query_as::<_, Company>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(companies)
    }
}
