// src/models/collection.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::{validate_postal_code, validate_state};

// Status de uma coleta. A coluna no banco é TEXT com CHECK;
// o mapeamento texto <-> enum fica aqui.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Requested,
    Scheduled,
    Collected,
    Completed,
    Cancelled,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Requested => "requested",
            CollectionStatus::Scheduled => "scheduled",
            CollectionStatus::Collected => "collected",
            CollectionStatus::Completed => "completed",
            CollectionStatus::Cancelled => "cancelled",
        }
    }

    /// Tabela de transições permitidas.
    /// `Completed` e `Cancelled` são terminais.
    pub fn can_transition_to(&self, next: CollectionStatus) -> bool {
        use CollectionStatus::*;
        matches!(
            (self, next),
            (Requested, Scheduled)
                | (Requested, Cancelled)
                | (Scheduled, Collected)
                | (Scheduled, Cancelled)
                | (Collected, Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CollectionStatus::Completed | CollectionStatus::Cancelled)
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(CollectionStatus::Requested),
            "scheduled" => Ok(CollectionStatus::Scheduled),
            "collected" => Ok(CollectionStatus::Collected),
            "completed" => Ok(CollectionStatus::Completed),
            "cancelled" => Ok(CollectionStatus::Cancelled),
            other => Err(anyhow::anyhow!("Status de coleta desconhecido: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub status: CollectionStatus,
    pub final_destination: String,
    pub scheduled_date: NaiveDate,
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub complement: Option<String>,
    pub postal_code: String,
    pub collection_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub description: String,
    pub notes: Option<String>,
    pub collection_id: Uuid,
}

// Endereço informado pelo usuário (também usado como payload)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    #[validate(length(min = 1, message = "A rua é obrigatória."))]
    #[schema(example = "Av. Paulista")]
    pub street: String,

    #[validate(length(min = 1, message = "O número é obrigatório."))]
    #[schema(example = "1000")]
    pub number: String,

    #[validate(length(min = 1, message = "O bairro é obrigatório."))]
    #[schema(example = "Bela Vista")]
    pub neighborhood: String,

    #[validate(length(min = 1, message = "A cidade é obrigatória."))]
    #[schema(example = "São Paulo")]
    pub city: String,

    #[validate(custom(function = "validate_state"))]
    #[schema(example = "SP")]
    pub state: String,

    pub complement: Option<String>,

    #[validate(custom(function = "validate_postal_code"))]
    #[schema(example = "01310-100")]
    pub postal_code: String,
}

// Item informado pelo usuário (também usado como payload)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    #[validate(length(min = 1, max = 200, message = "Descreva o item."))]
    #[schema(example = "Notebook")]
    pub description: String,

    #[validate(length(max = 1000, message = "Observações muito longas."))]
    #[schema(example = "Bateria estufada")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionPayload {
    #[schema(example = "2030-01-15")]
    pub scheduled_date: NaiveDate,

    #[validate(length(min = 1, max = 120, message = "Informe a destinação final."))]
    #[schema(example = "reciclagem")]
    pub final_destination: String,

    pub company_id: Option<Uuid>,

    #[validate(nested)]
    pub address: NewAddress,

    #[validate(length(min = 1, message = "Informe ao menos um item."), nested)]
    pub items: Vec<NewItem>,
}

// Pedido de coleta completo, gravado numa única transação
#[derive(Debug, Clone)]
pub struct NewCollection {
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub scheduled_date: NaiveDate,
    pub final_destination: String,
    pub address: NewAddress,
    pub items: Vec<NewItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDetail {
    #[serde(flatten)]
    pub collection: Collection,
    pub address: Option<Address>,
    pub items: Vec<Item>,
}
