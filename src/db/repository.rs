// src/db/repository.rs
//
// Contratos de persistência, um por entidade. Os serviços dependem só
// destes traits; o backend (Postgres ou memória) é escolhido no AppState.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{NewUser, PasswordResetCode, Session, User},
        collection::{
            Address, Collection, CollectionDetail, CollectionStatus, Item, NewAddress,
            NewCollection, NewItem,
        },
        company::{Company, NewCompany},
    },
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Falha com `DuplicateEmail` / `DuplicateTaxId` quando a constraint
    /// única correspondente é violada.
    async fn create(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<User>, AppError>;
    async fn update_contact(&self, id: Uuid, phone: &str, tax_id: &str) -> Result<User, AppError>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<(), AppError>;
    async fn find(&self, id: Uuid) -> Result<Option<Session>, AppError>;
    /// Idempotente: apagar uma sessão inexistente não é erro.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;
}

#[async_trait]
pub trait ResetCodeRepository: Send + Sync {
    /// Descarta códigos ainda não usados do usuário e grava o novo.
    async fn replace(
        &self,
        user_id: Uuid,
        code_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetCode, AppError>;

    /// Código mais recente ainda não consumido (expirado ou não).
    async fn find_active(&self, user_id: Uuid) -> Result<Option<PasswordResetCode>, AppError>;

    async fn record_failure(&self, id: Uuid) -> Result<(), AppError>;

    /// Marca o código como usado. Retorna `false` se outro pedido já o consumiu.
    async fn consume(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn create(&self, company: NewCompany) -> Result<Company, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Company>, AppError>;
    async fn find_by_registration_number(
        &self,
        registration_number: &str,
    ) -> Result<Option<Company>, AppError>;
    async fn list(&self) -> Result<Vec<Company>, AppError>;
}

#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Grava coleta, endereço e itens numa única transação.
    async fn create(&self, collection: NewCollection) -> Result<CollectionDetail, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Collection>, AppError>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Collection>, AppError>;
    async fn update_status(
        &self,
        id: Uuid,
        status: CollectionStatus,
    ) -> Result<Collection, AppError>;
    async fn assign_company(
        &self,
        id: Uuid,
        company_id: Uuid,
        status: CollectionStatus,
    ) -> Result<Collection, AppError>;
    async fn add_item(&self, collection_id: Uuid, item: NewItem) -> Result<Item, AppError>;
    async fn list_items(&self, collection_id: Uuid) -> Result<Vec<Item>, AppError>;
    /// Substitui o endereço da coleta (no máximo um por coleta).
    async fn set_address(
        &self,
        collection_id: Uuid,
        address: NewAddress,
    ) -> Result<Address, AppError>;
    async fn find_address(&self, collection_id: Uuid) -> Result<Option<Address>, AppError>;
    /// Remove itens, endereço e a coleta, nesta ordem, numa transação.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}
