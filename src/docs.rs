// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,

        // --- Users ---
        handlers::auth::get_me,
        handlers::profile::update_profile,

        // --- Collections ---
        handlers::collections::create_collection,
        handlers::collections::list_collections,
        handlers::collections::get_collection,
        handlers::collections::delete_collection,
        handlers::collections::add_item,
        handlers::collections::set_address,
        handlers::collections::cancel_collection,
        handlers::collections::assign_company,
        handlers::collections::transition_collection,

        // --- Companies ---
        handlers::companies::register_company,
        handlers::companies::list_companies,
        handlers::companies::get_company,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::ForgotPasswordPayload,
            models::auth::ResetPasswordPayload,
            models::auth::UpdateProfilePayload,
            models::auth::RegisterResponse,
            models::auth::AuthResponse,

            // --- Collections ---
            models::collection::CollectionStatus,
            models::collection::Collection,
            models::collection::Address,
            models::collection::Item,
            models::collection::NewAddress,
            models::collection::NewItem,
            models::collection::CreateCollectionPayload,
            models::collection::CollectionDetail,
            handlers::collections::AssignCompanyPayload,
            handlers::collections::TransitionCollectionPayload,

            // --- Companies ---
            models::company::Company,
            models::company::RegisterCompanyPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação, Sessão e Recuperação de Senha"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Collections", description = "Pedidos de Coleta de Lixo Eletrônico"),
        (name = "Companies", description = "Empresas de Coleta e Destinação")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
