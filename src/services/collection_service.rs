// src/services/collection_service.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{clock::Clock, error::AppError, validation::digits_only},
    db::{CollectionRepository, CompanyRepository, Repositories, UserRepository},
    models::collection::{
        Address, Collection, CollectionDetail, CollectionStatus, CreateCollectionPayload, Item,
        NewAddress, NewCollection, NewItem,
    },
};

#[derive(Clone)]
pub struct CollectionService {
    collections: Arc<dyn CollectionRepository>,
    users: Arc<dyn UserRepository>,
    companies: Arc<dyn CompanyRepository>,
    clock: Arc<dyn Clock>,
}

impl CollectionService {
    pub fn new(repos: &Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            collections: repos.collections.clone(),
            users: repos.users.clone(),
            companies: repos.companies.clone(),
            clock,
        }
    }

    pub async fn create_collection(
        &self,
        user_id: Uuid,
        payload: CreateCollectionPayload,
    ) -> Result<CollectionDetail, AppError> {
        payload.validate()?;

        // Chaves estrangeiras conferidas antes do INSERT
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::ReferentialIntegrity(format!(
                "usuário {} não existe",
                user_id
            )));
        }
        if let Some(company_id) = payload.company_id {
            self.ensure_company(company_id).await?;
        }

        let today = self.clock.now().date_naive();
        if payload.scheduled_date < today {
            return Err(AppError::InvalidInput(
                "A data agendada não pode estar no passado.".into(),
            ));
        }

        let detail = self
            .collections
            .create(NewCollection {
                user_id,
                company_id: payload.company_id,
                scheduled_date: payload.scheduled_date,
                final_destination: payload.final_destination.trim().to_string(),
                address: normalize_address(payload.address),
                items: payload.items,
            })
            .await?;

        tracing::info!(
            "♻️ Coleta {} solicitada pelo usuário {} ({} itens).",
            detail.collection.id,
            user_id,
            detail.items.len()
        );
        Ok(detail)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Collection>, AppError> {
        self.collections.list_by_user(user_id).await
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<CollectionDetail, AppError> {
        let collection = self.owned(user_id, id).await?;
        let address = self.collections.find_address(id).await?;
        let items = self.collections.list_items(id).await?;
        Ok(CollectionDetail {
            collection,
            address,
            items,
        })
    }

    pub async fn add_item(
        &self,
        user_id: Uuid,
        id: Uuid,
        item: NewItem,
    ) -> Result<Item, AppError> {
        item.validate()?;
        let collection = self.owned(user_id, id).await?;
        ensure_editable(&collection)?;
        self.collections.add_item(id, item).await
    }

    pub async fn set_address(
        &self,
        user_id: Uuid,
        id: Uuid,
        address: NewAddress,
    ) -> Result<Address, AppError> {
        address.validate()?;
        let collection = self.owned(user_id, id).await?;
        ensure_editable(&collection)?;
        self.collections
            .set_address(id, normalize_address(address))
            .await
    }

    /// Vincula a empresa responsável e marca a coleta como agendada.
    pub async fn assign_company(
        &self,
        user_id: Uuid,
        id: Uuid,
        company_id: Uuid,
    ) -> Result<Collection, AppError> {
        self.ensure_company(company_id).await?;
        let collection = self.owned(user_id, id).await?;

        // Trocar de empresa é permitido enquanto nada foi recolhido
        match collection.status {
            CollectionStatus::Requested | CollectionStatus::Scheduled => {}
            from => {
                return Err(AppError::InvalidStatusTransition {
                    from,
                    to: CollectionStatus::Scheduled,
                })
            }
        }

        let updated = self
            .collections
            .assign_company(id, company_id, CollectionStatus::Scheduled)
            .await?;
        tracing::info!("🚚 Coleta {} atribuída à empresa {}.", id, company_id);
        Ok(updated)
    }

    pub async fn transition(
        &self,
        user_id: Uuid,
        id: Uuid,
        next: CollectionStatus,
    ) -> Result<Collection, AppError> {
        let collection = self.owned(user_id, id).await?;
        if collection.status.is_terminal() {
            tracing::warn!(
                "Coleta {} já encerrada ({}); pedido de '{}' recusado.",
                id,
                collection.status,
                next
            );
            return Err(AppError::InvalidStatusTransition {
                from: collection.status,
                to: next,
            });
        }
        if !collection.status.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition {
                from: collection.status,
                to: next,
            });
        }
        // Agendar exige uma empresa responsável
        if next == CollectionStatus::Scheduled && collection.company_id.is_none() {
            return Err(AppError::InvalidInput(
                "Atribua uma empresa antes de agendar a coleta.".into(),
            ));
        }

        let updated = self.collections.update_status(id, next).await?;
        tracing::info!(
            "Coleta {}: {} -> {}",
            id,
            collection.status,
            updated.status
        );
        Ok(updated)
    }

    pub async fn cancel(&self, user_id: Uuid, id: Uuid) -> Result<Collection, AppError> {
        self.transition(user_id, id, CollectionStatus::Cancelled).await
    }

    /// Apaga a coleta e seus dependentes. Só pedidos ainda não atendidos
    /// ou cancelados podem ser apagados.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let collection = self.owned(user_id, id).await?;
        if !matches!(
            collection.status,
            CollectionStatus::Requested | CollectionStatus::Cancelled
        ) {
            return Err(AppError::InvalidInput(format!(
                "Coletas com status '{}' não podem ser removidas.",
                collection.status
            )));
        }

        self.collections.delete(id).await?;
        tracing::info!("🗑️ Coleta {} removida com itens e endereço.", id);
        Ok(())
    }

    // Coletas de outro usuário respondem como inexistentes
    async fn owned(&self, user_id: Uuid, id: Uuid) -> Result<Collection, AppError> {
        match self.collections.find_by_id(id).await? {
            Some(collection) if collection.user_id == user_id => Ok(collection),
            _ => Err(AppError::NotFound("Coleta")),
        }
    }

    async fn ensure_company(&self, company_id: Uuid) -> Result<(), AppError> {
        if self.companies.find_by_id(company_id).await?.is_none() {
            return Err(AppError::ReferentialIntegrity(format!(
                "empresa {} não existe",
                company_id
            )));
        }
        Ok(())
    }
}

fn ensure_editable(collection: &Collection) -> Result<(), AppError> {
    if collection.status != CollectionStatus::Requested {
        return Err(AppError::InvalidInput(format!(
            "A coleta está '{}' e não pode mais ser alterada.",
            collection.status
        )));
    }
    Ok(())
}

fn normalize_address(address: NewAddress) -> NewAddress {
    NewAddress {
        street: address.street.trim().to_string(),
        number: address.number.trim().to_string(),
        neighborhood: address.neighborhood.trim().to_string(),
        city: address.city.trim().to_string(),
        state: address.state.trim().to_uppercase(),
        complement: address
            .complement
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        postal_code: digits_only(&address.postal_code),
    }
}
