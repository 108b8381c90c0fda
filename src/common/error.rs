// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::collection::CollectionStatus;

// O erro único da aplicação. Serviços e repositórios devolvem sempre AppError.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Regras que não cabem nas derives do `validator` (ex: data no passado)
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("E-mail já existe")]
    DuplicateEmail,

    #[error("CPF já cadastrado")]
    DuplicateTaxId,

    #[error("CNPJ já cadastrado")]
    DuplicateRegistrationNumber,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Não autorizado")]
    Unauthorized,

    #[error("Código inválido ou expirado")]
    InvalidOrExpiredCode,

    #[error("Violação de integridade referencial: {0}")]
    ReferentialIntegrity(String),

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidStatusTransition {
        from: CollectionStatus,
        to: CollectionStatus,
    },

    #[error("{0} não encontrado(a)")]
    NotFound(&'static str),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Converte um erro do Postgres em um erro de domínio quando possível,
    /// olhando o nome da constraint violada.
    pub fn from_db(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if let Some(constraint) = db_err.constraint() {
                if db_err.is_unique_violation() {
                    return match constraint {
                        "users_email_key" | "companies_email_key" => AppError::DuplicateEmail,
                        "users_tax_id_key" => AppError::DuplicateTaxId,
                        "companies_registration_number_key" => {
                            AppError::DuplicateRegistrationNumber
                        }
                        _ => AppError::DatabaseError(e),
                    };
                }
                if db_err.is_foreign_key_violation() {
                    return AppError::ReferentialIntegrity(constraint.to_string());
                }
            }
        }
        AppError::DatabaseError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Devolve todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidInput(message) => {
                let body = Json(json!({ "error": message }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::DuplicateEmail => (StatusCode::CONFLICT, "Este e-mail já está em uso."),
            AppError::DuplicateTaxId => (StatusCode::CONFLICT, "Este CPF já está cadastrado."),
            AppError::DuplicateRegistrationNumber => {
                (StatusCode::CONFLICT, "Este CNPJ já está cadastrado.")
            }
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos."),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Sessão inválida ou sem permissão para esta ação.",
            ),
            AppError::InvalidOrExpiredCode => {
                (StatusCode::BAD_REQUEST, "Código inválido ou expirado.")
            }
            AppError::ReferentialIntegrity(ref what) => {
                tracing::warn!("Violação de integridade referencial: {}", what);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Registro relacionado não encontrado.",
                )
            }
            AppError::InvalidStatusTransition { from, to } => {
                let body = Json(json!({
                    "error": "Transição de status não permitida.",
                    "from": from,
                    "to": to,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::NotFound(what) => {
                let body = Json(json!({ "error": format!("{} não encontrado(a).", what) }));
                return (StatusCode::NOT_FOUND, body).into_response();
            }

            // Todos os outros erros (banco, bcrypt, jwt, anyhow) viram 500.
            ref e => {
                tracing::error!("🔥 Erro Interno do Servidor: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
