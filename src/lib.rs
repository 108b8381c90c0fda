//src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

/// Monta o router completo da API. Separado do `main` para os testes
/// conseguirem exercitar as rotas com `oneshot`.
pub fn build_router(app_state: AppState) -> Router {
    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/forgot-password", post(handlers::auth::forgot_password))
        .route("/reset-password", post(handlers::auth::reset_password));

    // Define as rotas de usuário (protegidas pelo middleware)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/profile", put(handlers::profile::update_profile))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let collection_routes = Router::new()
        .route("/"
               ,post(handlers::collections::create_collection)
               .get(handlers::collections::list_collections)
        )
        .route("/{collection_id}"
               ,get(handlers::collections::get_collection)
               .delete(handlers::collections::delete_collection)
        )
        .route("/{collection_id}/items", post(handlers::collections::add_item))
        .route("/{collection_id}/address", put(handlers::collections::set_address))
        .route("/{collection_id}/cancel", post(handlers::collections::cancel_collection))
        .route("/{collection_id}/assign", post(handlers::collections::assign_company))
        .route("/{collection_id}/status", post(handlers::collections::transition_collection))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let company_routes = Router::new()
        .route("/"
               ,post(handlers::companies::register_company)
               .get(handlers::companies::list_companies)
        )
        .route("/{company_id}", get(handlers::companies::get_company));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/collections", collection_routes)
        .nest("/api/companies", company_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
