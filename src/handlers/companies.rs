// src/handlers/companies.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::company::{Company, RegisterCompanyPayload},
};

#[utoipa::path(
    post,
    path = "/api/companies",
    tag = "Companies",
    request_body = RegisterCompanyPayload,
    responses(
        (status = 201, description = "Empresa cadastrada", body = Company),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail ou CNPJ já cadastrado")
    )
)]
pub async fn register_company(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterCompanyPayload>,
) -> Result<impl IntoResponse, AppError> {
    let company = app_state.company_service.register_company(payload).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

#[utoipa::path(
    get,
    path = "/api/companies",
    tag = "Companies",
    responses((status = 200, description = "Empresas cadastradas", body = Vec<Company>))
)]
pub async fn list_companies(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Company>>, AppError> {
    Ok(Json(app_state.company_service.list_companies().await?))
}

#[utoipa::path(
    get,
    path = "/api/companies/{company_id}",
    tag = "Companies",
    responses(
        (status = 200, description = "Empresa", body = Company),
        (status = 404, description = "Empresa não encontrada")
    ),
    params(("company_id" = Uuid, Path, description = "ID da Empresa"))
)]
pub async fn get_company(
    State(app_state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<Company>, AppError> {
    Ok(Json(app_state.company_service.get_company(company_id).await?))
}
