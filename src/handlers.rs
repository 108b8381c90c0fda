pub mod auth;
pub mod collections;
pub mod companies;
pub mod profile;
