pub mod auth;
pub use auth::AuthService;
pub mod collection_service;
pub use collection_service::CollectionService;
pub mod company_service;
pub use company_service::CompanyService;
pub mod notification;
pub mod profile;
pub use profile::ProfileService;
