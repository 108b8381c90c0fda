pub mod repository;
pub use repository::{
    CollectionRepository, CompanyRepository, ResetCodeRepository, SessionRepository,
    UserRepository,
};

pub mod user_repo;
pub use user_repo::PgUserRepository;
pub mod session_repo;
pub use session_repo::PgSessionRepository;
pub mod reset_code_repo;
pub use reset_code_repo::PgResetCodeRepository;
pub mod company_repo;
pub use company_repo::PgCompanyRepository;
pub mod collection_repo;
pub use collection_repo::PgCollectionRepository;

pub mod memory;
pub use memory::MemoryStore;

use std::sync::Arc;

use sqlx::PgPool;

use crate::common::clock::Clock;

// Conjunto de repositórios injetado nos serviços.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub reset_codes: Arc<dyn ResetCodeRepository>,
    pub companies: Arc<dyn CompanyRepository>,
    pub collections: Arc<dyn CollectionRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool.clone())),
            reset_codes: Arc::new(PgResetCodeRepository::new(pool.clone())),
            companies: Arc::new(PgCompanyRepository::new(pool.clone())),
            collections: Arc::new(PgCollectionRepository::new(pool)),
        }
    }

    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(MemoryStore::with_clock(clock));
        Self {
            users: store.clone(),
            sessions: store.clone(),
            reset_codes: store.clone(),
            companies: store.clone(),
            collections: store,
        }
    }
}
