// src/handlers/profile.rs

use axum::{extract::State, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{UpdateProfilePayload, User},
};

#[utoipa::path(
    put,
    path = "/api/users/me/profile",
    tag = "Users",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Perfil atualizado", body = User),
        (status = 400, description = "Dados inválidos"),
        (status = 401, description = "Sessão inválida ou e-mail divergente"),
        (status = 409, description = "CPF já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<User>, AppError> {
    let user = app_state
        .profile_service
        .update_profile(&auth.token, payload)
        .await?;
    Ok(Json(user))
}
