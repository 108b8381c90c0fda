// src/handlers/collections.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::collection::{
        Address, Collection, CollectionDetail, CollectionStatus, CreateCollectionPayload, Item,
        NewAddress, NewItem,
    },
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignCompanyPayload {
    pub company_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionCollectionPayload {
    #[schema(example = "collected")]
    pub status: CollectionStatus,
}

// POST /api/collections
#[utoipa::path(
    post,
    path = "/api/collections",
    tag = "Collections",
    request_body = CreateCollectionPayload,
    responses(
        (status = 201, description = "Coleta solicitada", body = CollectionDetail),
        (status = 400, description = "Dados inválidos"),
        (status = 422, description = "Empresa inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_collection(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Json(payload): Json<CreateCollectionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .collection_service
        .create_collection(auth.user.id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/collections
#[utoipa::path(
    get,
    path = "/api/collections",
    tag = "Collections",
    responses((status = 200, description = "Coletas do usuário", body = Vec<Collection>)),
    security(("api_jwt" = []))
)]
pub async fn list_collections(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<Collection>>, AppError> {
    let collections = app_state
        .collection_service
        .list_for_user(auth.user.id)
        .await?;
    Ok(Json(collections))
}

#[utoipa::path(
    get,
    path = "/api/collections/{collection_id}",
    tag = "Collections",
    responses(
        (status = 200, description = "Detalhe da coleta", body = CollectionDetail),
        (status = 404, description = "Coleta não encontrada")
    ),
    params(("collection_id" = Uuid, Path, description = "ID da Coleta")),
    security(("api_jwt" = []))
)]
pub async fn get_collection(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(collection_id): Path<Uuid>,
) -> Result<Json<CollectionDetail>, AppError> {
    let detail = app_state
        .collection_service
        .get(auth.user.id, collection_id)
        .await?;
    Ok(Json(detail))
}

#[utoipa::path(
    delete,
    path = "/api/collections/{collection_id}",
    tag = "Collections",
    responses(
        (status = 204, description = "Coleta removida"),
        (status = 400, description = "Status não permite remoção"),
        (status = 404, description = "Coleta não encontrada")
    ),
    params(("collection_id" = Uuid, Path, description = "ID da Coleta")),
    security(("api_jwt" = []))
)]
pub async fn delete_collection(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(collection_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state
        .collection_service
        .delete(auth.user.id, collection_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/collections/{id}/items
#[utoipa::path(
    post,
    path = "/api/collections/{collection_id}/items",
    tag = "Collections",
    request_body = NewItem,
    responses(
        (status = 201, description = "Item adicionado", body = Item),
        (status = 404, description = "Coleta não encontrada")
    ),
    params(("collection_id" = Uuid, Path, description = "ID da Coleta")),
    security(("api_jwt" = []))
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(collection_id): Path<Uuid>,
    Json(payload): Json<NewItem>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .collection_service
        .add_item(auth.user.id, collection_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

// PUT /api/collections/{id}/address
#[utoipa::path(
    put,
    path = "/api/collections/{collection_id}/address",
    tag = "Collections",
    request_body = NewAddress,
    responses(
        (status = 200, description = "Endereço definido", body = Address),
        (status = 404, description = "Coleta não encontrada")
    ),
    params(("collection_id" = Uuid, Path, description = "ID da Coleta")),
    security(("api_jwt" = []))
)]
pub async fn set_address(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(collection_id): Path<Uuid>,
    Json(payload): Json<NewAddress>,
) -> Result<Json<Address>, AppError> {
    let address = app_state
        .collection_service
        .set_address(auth.user.id, collection_id, payload)
        .await?;
    Ok(Json(address))
}

#[utoipa::path(
    post,
    path = "/api/collections/{collection_id}/cancel",
    tag = "Collections",
    responses(
        (status = 200, description = "Coleta cancelada", body = Collection),
        (status = 409, description = "Transição de status inválida")
    ),
    params(("collection_id" = Uuid, Path, description = "ID da Coleta")),
    security(("api_jwt" = []))
)]
pub async fn cancel_collection(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(collection_id): Path<Uuid>,
) -> Result<Json<Collection>, AppError> {
    let collection = app_state
        .collection_service
        .cancel(auth.user.id, collection_id)
        .await?;
    Ok(Json(collection))
}

#[utoipa::path(
    post,
    path = "/api/collections/{collection_id}/assign",
    tag = "Collections",
    request_body = AssignCompanyPayload,
    responses(
        (status = 200, description = "Empresa atribuída; coleta agendada", body = Collection),
        (status = 409, description = "Transição de status inválida"),
        (status = 422, description = "Empresa inexistente")
    ),
    params(("collection_id" = Uuid, Path, description = "ID da Coleta")),
    security(("api_jwt" = []))
)]
pub async fn assign_company(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(collection_id): Path<Uuid>,
    Json(payload): Json<AssignCompanyPayload>,
) -> Result<Json<Collection>, AppError> {
    let collection = app_state
        .collection_service
        .assign_company(auth.user.id, collection_id, payload.company_id)
        .await?;
    Ok(Json(collection))
}

#[utoipa::path(
    post,
    path = "/api/collections/{collection_id}/status",
    tag = "Collections",
    request_body = TransitionCollectionPayload,
    responses(
        (status = 200, description = "Status atualizado", body = Collection),
        (status = 409, description = "Transição de status inválida")
    ),
    params(("collection_id" = Uuid, Path, description = "ID da Coleta")),
    security(("api_jwt" = []))
)]
pub async fn transition_collection(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(collection_id): Path<Uuid>,
    Json(payload): Json<TransitionCollectionPayload>,
) -> Result<Json<Collection>, AppError> {
    let collection = app_state
        .collection_service
        .transition(auth.user.id, collection_id, payload.status)
        .await?;
    Ok(Json(collection))
}
