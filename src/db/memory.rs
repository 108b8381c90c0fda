// src/db/memory.rs
//
// Backend em memória. Aplica as mesmas regras do schema Postgres
// (chaves únicas e estrangeiras) para que os serviços se comportem igual.
// Usado nos testes e quando DATABASE_URL não está definida.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::{
        clock::{Clock, SystemClock},
        error::AppError,
    },
    db::repository::{
        CollectionRepository, CompanyRepository, ResetCodeRepository, SessionRepository,
        UserRepository,
    },
    models::{
        auth::{NewUser, PasswordResetCode, Session, User},
        collection::{
            Address, Collection, CollectionDetail, CollectionStatus, Item, NewAddress,
            NewCollection, NewItem,
        },
        company::{Company, NewCompany},
    },
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
    reset_codes: HashMap<Uuid, PasswordResetCode>,
    companies: HashMap<Uuid, Company>,
    collections: HashMap<Uuid, Collection>,
    addresses: HashMap<Uuid, Address>,
    items: Vec<Item>,
}

impl Tables {
    fn ensure_collection(&self, id: Uuid) -> Result<(), AppError> {
        if self.collections.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::ReferentialIntegrity("collection_id".into()))
        }
    }

    fn make_address(collection_id: Uuid, address: &NewAddress) -> Address {
        Address {
            id: Uuid::new_v4(),
            street: address.street.clone(),
            number: address.number.clone(),
            neighborhood: address.neighborhood.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            complement: address.complement.clone(),
            postal_code: address.postal_code.clone(),
            collection_id,
        }
    }

    fn make_item(collection_id: Uuid, item: &NewItem) -> Item {
        Item {
            id: Uuid::new_v4(),
            description: item.description.clone(),
            notes: item.notes.clone(),
            collection_id,
        }
    }
}

/// Implementa todos os traits de repositório sobre um único lock,
/// o que torna cada operação atômica.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    // Mesmo relógio dos serviços: created_at/updated_at seguem o ManualClock nos testes
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::default(),
            clock,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::DuplicateEmail);
        }
        if tables.users.values().any(|u| u.tax_id == user.tax_id) {
            return Err(AppError::DuplicateTaxId);
        }

        let now = self.clock.now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            tax_id: user.tax_id,
            password_hash: user.password_hash,
            phone: user.phone,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.tax_id == tax_id).cloned())
    }

    async fn update_contact(&self, id: Uuid, phone: &str, tax_id: &str) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.id != id && u.tax_id == tax_id) {
            return Err(AppError::DuplicateTaxId);
        }

        let user = tables.users.get_mut(&id).ok_or(AppError::NotFound("Usuário"))?;
        user.phone = phone.to_string();
        user.tax_id = tax_id.to_string();
        user.updated_at = self.clock.now();
        Ok(user.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(AppError::NotFound("Usuário"))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = self.clock.now();
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create(&self, session: &Session) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&session.user_id) {
            return Err(AppError::ReferentialIntegrity("sessions_user_id_fkey".into()));
        }
        // Aproveita a escrita para descartar sessões já vencidas
        tables
            .sessions
            .retain(|_, s| s.expires_at > session.created_at);
        tables.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Session>, AppError> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.tables.write().await.sessions.remove(&id);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl ResetCodeRepository for MemoryStore {
    async fn replace(
        &self,
        user_id: Uuid,
        code_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetCode, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AppError::ReferentialIntegrity(
                "password_reset_codes_user_id_fkey".into(),
            ));
        }

        // Códigos anteriores do usuário, usados ou não, deixam de servir
        tables.reset_codes.retain(|_, c| c.user_id != user_id);

        let code = PasswordResetCode {
            id: Uuid::new_v4(),
            user_id,
            code_hash: code_hash.to_string(),
            created_at,
            expires_at,
            consumed_at: None,
            failed_attempts: 0,
        };
        tables.reset_codes.insert(code.id, code.clone());
        Ok(code)
    }

    async fn find_active(&self, user_id: Uuid) -> Result<Option<PasswordResetCode>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reset_codes
            .values()
            .filter(|c| c.user_id == user_id && c.consumed_at.is_none())
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn record_failure(&self, id: Uuid) -> Result<(), AppError> {
        if let Some(code) = self.tables.write().await.reset_codes.get_mut(&id) {
            code.failed_attempts += 1;
        }
        Ok(())
    }

    async fn consume(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.reset_codes.get_mut(&id) {
            Some(code) if code.consumed_at.is_none() => {
                code.consumed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl CompanyRepository for MemoryStore {
    async fn create(&self, company: NewCompany) -> Result<Company, AppError> {
        let mut tables = self.tables.write().await;

        if tables.companies.values().any(|c| c.email == company.email) {
            return Err(AppError::DuplicateEmail);
        }
        if tables
            .companies
            .values()
            .any(|c| c.registration_number == company.registration_number)
        {
            return Err(AppError::DuplicateRegistrationNumber);
        }

        let created = Company {
            id: Uuid::new_v4(),
            name: company.name,
            email: company.email,
            password_hash: company.password_hash,
            registration_number: company.registration_number,
            created_at: self.clock.now(),
        };
        tables.companies.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, AppError> {
        Ok(self.tables.read().await.companies.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Company>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.companies.values().find(|c| c.email == email).cloned())
    }

    async fn find_by_registration_number(
        &self,
        registration_number: &str,
    ) -> Result<Option<Company>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .companies
            .values()
            .find(|c| c.registration_number == registration_number)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Company>, AppError> {
        let tables = self.tables.read().await;
        let mut companies: Vec<Company> = tables.companies.values().cloned().collect();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }
}

#[async_trait]
impl CollectionRepository for MemoryStore {
    async fn create(&self, new: NewCollection) -> Result<CollectionDetail, AppError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&new.user_id) {
            return Err(AppError::ReferentialIntegrity("collections_user_id_fkey".into()));
        }
        if let Some(company_id) = new.company_id {
            if !tables.companies.contains_key(&company_id) {
                return Err(AppError::ReferentialIntegrity(
                    "collections_company_id_fkey".into(),
                ));
            }
        }

        let now = self.clock.now();
        let collection = Collection {
            id: Uuid::new_v4(),
            status: CollectionStatus::Requested,
            final_destination: new.final_destination,
            scheduled_date: new.scheduled_date,
            user_id: new.user_id,
            company_id: new.company_id,
            created_at: now,
            updated_at: now,
        };
        let address = Tables::make_address(collection.id, &new.address);
        let items: Vec<Item> = new
            .items
            .iter()
            .map(|item| Tables::make_item(collection.id, item))
            .collect();

        tables.collections.insert(collection.id, collection.clone());
        tables.addresses.insert(address.id, address.clone());
        tables.items.extend(items.iter().cloned());

        Ok(CollectionDetail {
            collection,
            address: Some(address),
            items,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Collection>, AppError> {
        Ok(self.tables.read().await.collections.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Collection>, AppError> {
        let tables = self.tables.read().await;
        let mut list: Vec<Collection> = tables
            .collections
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.scheduled_date.cmp(&a.scheduled_date));
        Ok(list)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: CollectionStatus,
    ) -> Result<Collection, AppError> {
        let mut tables = self.tables.write().await;
        let collection = tables
            .collections
            .get_mut(&id)
            .ok_or(AppError::NotFound("Coleta"))?;
        collection.status = status;
        collection.updated_at = self.clock.now();
        Ok(collection.clone())
    }

    async fn assign_company(
        &self,
        id: Uuid,
        company_id: Uuid,
        status: CollectionStatus,
    ) -> Result<Collection, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.companies.contains_key(&company_id) {
            return Err(AppError::ReferentialIntegrity(
                "collections_company_id_fkey".into(),
            ));
        }
        let collection = tables
            .collections
            .get_mut(&id)
            .ok_or(AppError::NotFound("Coleta"))?;
        collection.company_id = Some(company_id);
        collection.status = status;
        collection.updated_at = self.clock.now();
        Ok(collection.clone())
    }

    async fn add_item(&self, collection_id: Uuid, item: NewItem) -> Result<Item, AppError> {
        let mut tables = self.tables.write().await;
        tables.ensure_collection(collection_id)?;
        let item = Tables::make_item(collection_id, &item);
        tables.items.push(item.clone());
        Ok(item)
    }

    async fn list_items(&self, collection_id: Uuid) -> Result<Vec<Item>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .iter()
            .filter(|i| i.collection_id == collection_id)
            .cloned()
            .collect())
    }

    async fn set_address(
        &self,
        collection_id: Uuid,
        address: NewAddress,
    ) -> Result<Address, AppError> {
        let mut tables = self.tables.write().await;
        tables.ensure_collection(collection_id)?;
        tables.addresses.retain(|_, a| a.collection_id != collection_id);
        let address = Tables::make_address(collection_id, &address);
        tables.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn find_address(&self, collection_id: Uuid) -> Result<Option<Address>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .addresses
            .values()
            .find(|a| a.collection_id == collection_id)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if tables.collections.remove(&id).is_none() {
            return Err(AppError::NotFound("Coleta"));
        }
        tables.items.retain(|i| i.collection_id != id);
        tables.addresses.retain(|_, a| a.collection_id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_user(email: &str, tax_id: &str) -> NewUser {
        NewUser {
            name: "Ana".into(),
            email: email.into(),
            tax_id: tax_id.into(),
            phone: "11999999999".into(),
            password_hash: "hash".into(),
        }
    }

    fn new_address() -> NewAddress {
        NewAddress {
            street: "Av. Paulista".into(),
            number: "1000".into(),
            neighborhood: "Bela Vista".into(),
            city: "São Paulo".into(),
            state: "SP".into(),
            complement: None,
            postal_code: "01310100".into(),
        }
    }

    fn new_collection(user_id: Uuid) -> NewCollection {
        NewCollection {
            user_id,
            company_id: None,
            scheduled_date: NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(),
            final_destination: "reciclagem".into(),
            address: new_address(),
            items: vec![
                NewItem {
                    description: "Notebook".into(),
                    notes: None,
                },
                NewItem {
                    description: "Monitor".into(),
                    notes: Some("Tela trincada".into()),
                },
            ],
        }
    }

    #[tokio::test]
    async fn enforces_unique_user_email_and_tax_id() {
        let store = MemoryStore::new();
        UserRepository::create(&store, new_user("a@x.com", "11111111111"))
            .await
            .unwrap();

        let dup_email = UserRepository::create(&store, new_user("a@x.com", "22222222222")).await;
        assert!(matches!(dup_email, Err(AppError::DuplicateEmail)));

        let dup_tax = UserRepository::create(&store, new_user("b@x.com", "11111111111")).await;
        assert!(matches!(dup_tax, Err(AppError::DuplicateTaxId)));
    }

    #[tokio::test]
    async fn rejects_collection_for_unknown_user() {
        let store = MemoryStore::new();
        let result = CollectionRepository::create(&store, new_collection(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::ReferentialIntegrity(_))));
    }

    #[tokio::test]
    async fn rejects_item_for_unknown_collection() {
        let store = MemoryStore::new();
        let result = store
            .add_item(
                Uuid::new_v4(),
                NewItem {
                    description: "Celular".into(),
                    notes: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::ReferentialIntegrity(_))));
    }

    #[tokio::test]
    async fn delete_removes_dependents() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, new_user("a@x.com", "11111111111"))
            .await
            .unwrap();
        let detail = CollectionRepository::create(&store, new_collection(user.id))
            .await
            .unwrap();
        let id = detail.collection.id;
        assert_eq!(store.list_items(id).await.unwrap().len(), 2);

        CollectionRepository::delete(&store, id).await.unwrap();

        assert!(store.list_items(id).await.unwrap().is_empty());
        assert!(store.find_address(id).await.unwrap().is_none());
        assert!(CollectionRepository::find_by_id(&store, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_address_keeps_one_per_collection() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, new_user("a@x.com", "11111111111"))
            .await
            .unwrap();
        let detail = CollectionRepository::create(&store, new_collection(user.id))
            .await
            .unwrap();
        let id = detail.collection.id;

        let mut other = new_address();
        other.street = "Rua Augusta".into();
        store.set_address(id, other).await.unwrap();

        let address = store.find_address(id).await.unwrap().unwrap();
        assert_eq!(address.street, "Rua Augusta");
        let tables = store.tables.read().await;
        assert_eq!(tables.addresses.len(), 1);
    }

    #[tokio::test]
    async fn replacing_reset_code_discards_unconsumed_ones() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, new_user("a@x.com", "11111111111"))
            .await
            .unwrap();
        let now = Utc::now();
        let first = store
            .replace(user.id, "h1", now, now + chrono::Duration::minutes(30))
            .await
            .unwrap();
        let second = store
            .replace(user.id, "h2", now, now + chrono::Duration::minutes(30))
            .await
            .unwrap();

        let active = store.find_active(user.id).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        assert!(!store.consume(first.id, now).await.unwrap());
        assert!(store.consume(second.id, now).await.unwrap());
        assert!(!store.consume(second.id, now).await.unwrap());
    }

    fn session_for(user_id: Uuid, created_at: DateTime<Utc>, hours: i64) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id,
            email: "a@x.com".into(),
            created_at,
            expires_at: created_at + chrono::Duration::hours(hours),
        }
    }

    #[tokio::test]
    async fn new_session_evicts_expired_ones() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, new_user("a@x.com", "11111111111"))
            .await
            .unwrap();
        let t0 = Utc::now();

        let old = session_for(user.id, t0, 1);
        let still_valid = session_for(user.id, t0, 48);
        SessionRepository::create(&store, &old).await.unwrap();
        SessionRepository::create(&store, &still_valid).await.unwrap();

        let later = session_for(user.id, t0 + chrono::Duration::hours(2), 24);
        SessionRepository::create(&store, &later).await.unwrap();

        assert!(store.find(old.id).await.unwrap().is_none());
        assert!(store.find(still_valid.id).await.unwrap().is_some());
        assert!(store.find(later.id).await.unwrap().is_some());
        assert_eq!(store.tables.read().await.sessions.len(), 2);
    }

    #[tokio::test]
    async fn replacing_reset_code_drops_consumed_ones_too() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, new_user("a@x.com", "11111111111"))
            .await
            .unwrap();
        let now = Utc::now();
        let expires = now + chrono::Duration::minutes(30);

        for hash in ["h1", "h2", "h3"] {
            let code = store.replace(user.id, hash, now, expires).await.unwrap();
            assert!(store.consume(code.id, now).await.unwrap());
        }
        store.replace(user.id, "h4", now, expires).await.unwrap();

        assert_eq!(store.tables.read().await.reset_codes.len(), 1);
    }

    #[tokio::test]
    async fn timestamps_follow_the_injected_clock() {
        use crate::common::clock::ManualClock;
        use chrono::TimeZone;

        let start = Utc.with_ymd_and_hms(2030, 1, 10, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let store = MemoryStore::with_clock(Arc::new(clock.clone()));

        let user = UserRepository::create(&store, new_user("a@x.com", "11111111111"))
            .await
            .unwrap();
        assert_eq!(user.created_at, start);

        clock.advance(chrono::Duration::hours(3));
        let detail = CollectionRepository::create(&store, new_collection(user.id))
            .await
            .unwrap();
        assert_eq!(detail.collection.created_at, start + chrono::Duration::hours(3));

        clock.advance(chrono::Duration::minutes(5));
        let updated = store
            .update_status(detail.collection.id, CollectionStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(updated.updated_at, start + chrono::Duration::minutes(185));
    }
}
