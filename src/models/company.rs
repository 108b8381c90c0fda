// src/models/company.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::validate_registration_number;

// Empresa responsável pela coleta e destinação dos resíduos
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub email: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub registration_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub registration_number: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCompanyPayload {
    #[validate(length(min = 1, max = 160, message = "O nome é obrigatório."))]
    #[schema(example = "Recicla Tech Ltda")]
    pub name: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "contato@reciclatech.com.br")]
    pub email: String,

    #[validate(length(min = 8, message = "A senha deve ter no mínimo 8 caracteres."))]
    pub password: String,

    #[validate(custom(function = "validate_registration_number"))]
    #[schema(example = "12.345.678/0001-90")]
    pub registration_number: String,
}
