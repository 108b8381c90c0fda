// src/services/company_service.rs

use std::sync::Arc;

use bcrypt::hash;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        validation::{digits_only, normalize_email},
    },
    db::CompanyRepository,
    models::company::{Company, NewCompany, RegisterCompanyPayload},
};

#[derive(Clone)]
pub struct CompanyService {
    repo: Arc<dyn CompanyRepository>,
    bcrypt_cost: u32,
}

impl CompanyService {
    pub fn new(repo: Arc<dyn CompanyRepository>, bcrypt_cost: u32) -> Self {
        Self { repo, bcrypt_cost }
    }

    pub async fn register_company(
        &self,
        payload: RegisterCompanyPayload,
    ) -> Result<Company, AppError> {
        payload.validate()?;

        let email = normalize_email(&payload.email);
        let registration_number = digits_only(&payload.registration_number);

        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }
        if self
            .repo
            .find_by_registration_number(&registration_number)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateRegistrationNumber);
        }

        let password = payload.password;
        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let company = self
            .repo
            .create(NewCompany {
                name: payload.name.trim().to_string(),
                email,
                password_hash,
                registration_number,
            })
            .await?;

        tracing::info!("🏭 Empresa {} cadastrada.", company.id);
        Ok(company)
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>, AppError> {
        self.repo.list().await
    }

    pub async fn get_company(&self, id: Uuid) -> Result<Company, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Empresa"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn payload(email: &str, cnpj: &str) -> RegisterCompanyPayload {
        RegisterCompanyPayload {
            name: "Recicla Tech".into(),
            email: email.into(),
            password: "Senha123!".into(),
            registration_number: cnpj.into(),
        }
    }

    fn service() -> CompanyService {
        CompanyService::new(Arc::new(MemoryStore::new()), 4)
    }

    #[tokio::test]
    async fn registers_company_with_normalized_fields() {
        let service = service();
        let company = service
            .register_company(payload("Contato@Recicla.com", "12.345.678/0001-90"))
            .await
            .unwrap();

        assert_eq!(company.email, "contato@recicla.com");
        assert_eq!(company.registration_number, "12345678000190");
        assert_ne!(company.password_hash, "Senha123!");
        assert_eq!(service.get_company(company.id).await.unwrap().id, company.id);
    }

    #[tokio::test]
    async fn rejects_duplicate_email_and_registration_number() {
        let service = service();
        service
            .register_company(payload("a@recicla.com", "12345678000190"))
            .await
            .unwrap();

        let dup_email = service
            .register_company(payload("a@recicla.com", "99999999000199"))
            .await;
        assert!(matches!(dup_email, Err(AppError::DuplicateEmail)));

        let dup_cnpj = service
            .register_company(payload("b@recicla.com", "12.345.678/0001-90"))
            .await;
        assert!(matches!(dup_cnpj, Err(AppError::DuplicateRegistrationNumber)));

        assert_eq!(service.list_companies().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_malformed_registration_number() {
        let result = service()
            .register_company(payload("a@recicla.com", "123"))
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn unknown_company_is_not_found() {
        let result = service().get_company(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
