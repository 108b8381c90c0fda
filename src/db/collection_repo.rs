// src/db/collection_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::repository::CollectionRepository,
    models::collection::{
        Address, Collection, CollectionDetail, CollectionStatus, Item, NewAddress, NewCollection,
        NewItem,
    },
};

const COLLECTION_COLUMNS: &str =
    "id, status, final_destination, scheduled_date, user_id, company_id, created_at, updated_at";

const ADDRESS_COLUMNS: &str =
    "id, street, number, neighborhood, city, state, complement, postal_code, collection_id";

// Linha crua da tabela; o status chega como TEXT e é convertido aqui.
#[derive(sqlx::FromRow)]
struct CollectionRow {
    id: Uuid,
    status: String,
    final_destination: String,
    scheduled_date: NaiveDate,
    user_id: Uuid,
    company_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CollectionRow> for Collection {
    type Error = AppError;

    fn try_from(row: CollectionRow) -> Result<Self, Self::Error> {
        Ok(Collection {
            id: row.id,
            status: row.status.parse()?,
            final_destination: row.final_destination,
            scheduled_date: row.scheduled_date,
            user_id: row.user_id,
            company_id: row.company_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgCollectionRepository {
    pool: PgPool,
}

impl PgCollectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_address<'e, E>(
        executor: E,
        collection_id: Uuid,
        address: &NewAddress,
    ) -> Result<Address, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO addresses (
                id, street, number, neighborhood, city, state, complement, postal_code, collection_id
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {ADDRESS_COLUMNS}"
        );
        sqlx::query_as::<_, Address>(&sql)
            .bind(Uuid::new_v4())
            .bind(&address.street)
            .bind(&address.number)
            .bind(&address.neighborhood)
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.complement)
            .bind(&address.postal_code)
            .bind(collection_id)
            .fetch_one(executor)
            .await
            .map_err(AppError::from_db)
    }

    async fn insert_item<'e, E>(
        executor: E,
        collection_id: Uuid,
        item: &NewItem,
    ) -> Result<Item, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Item>(
            "INSERT INTO items (id, description, notes, collection_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id, description, notes, collection_id",
        )
        .bind(Uuid::new_v4())
        .bind(&item.description)
        .bind(&item.notes)
        .bind(collection_id)
        .fetch_one(executor)
        .await
        .map_err(AppError::from_db)
    }
}

#[async_trait]
impl CollectionRepository for PgCollectionRepository {
    async fn create(&self, new: NewCollection) -> Result<CollectionDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO collections (id, status, final_destination, scheduled_date, user_id, company_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLLECTION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CollectionRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(CollectionStatus::Requested.as_str())
            .bind(&new.final_destination)
            .bind(new.scheduled_date)
            .bind(new.user_id)
            .bind(new.company_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::from_db)?;
        let collection = Collection::try_from(row)?;

        // Se qualquer insert falhar, o tx sofre rollback ao sair do escopo (drop)
        let address = Self::insert_address(&mut *tx, collection.id, &new.address).await?;

        let mut items = Vec::with_capacity(new.items.len());
        for item in &new.items {
            items.push(Self::insert_item(&mut *tx, collection.id, item).await?);
        }

        tx.commit().await?;

        Ok(CollectionDetail {
            collection,
            address: Some(address),
            items,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Collection>, AppError> {
        let sql = format!("SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = $1");
        sqlx::query_as::<_, CollectionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Collection::try_from)
            .transpose()
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Collection>, AppError> {
        let sql = format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections
             WHERE user_id = $1
             ORDER BY scheduled_date DESC, created_at DESC"
        );
        sqlx::query_as::<_, CollectionRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Collection::try_from)
            .collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: CollectionStatus,
    ) -> Result<Collection, AppError> {
        let sql = format!(
            "UPDATE collections SET status = $2, updated_at = now()
             WHERE id = $1
             RETURNING {COLLECTION_COLUMNS}"
        );
        sqlx::query_as::<_, CollectionRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Coleta"))
            .and_then(Collection::try_from)
    }

    async fn assign_company(
        &self,
        id: Uuid,
        company_id: Uuid,
        status: CollectionStatus,
    ) -> Result<Collection, AppError> {
        let sql = format!(
            "UPDATE collections SET company_id = $2, status = $3, updated_at = now()
             WHERE id = $1
             RETURNING {COLLECTION_COLUMNS}"
        );
        sqlx::query_as::<_, CollectionRow>(&sql)
            .bind(id)
            .bind(company_id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from_db)?
            .ok_or(AppError::NotFound("Coleta"))
            .and_then(Collection::try_from)
    }

    async fn add_item(&self, collection_id: Uuid, item: NewItem) -> Result<Item, AppError> {
        Self::insert_item(&self.pool, collection_id, &item).await
    }

    async fn list_items(&self, collection_id: Uuid) -> Result<Vec<Item>, AppError> {
        let items = sqlx::query_as::<_, Item>(
            "SELECT id, description, notes, collection_id FROM items
             WHERE collection_id = $1",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn set_address(
        &self,
        collection_id: Uuid,
        address: NewAddress,
    ) -> Result<Address, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM addresses WHERE collection_id = $1")
            .bind(collection_id)
            .execute(&mut *tx)
            .await?;
        let address = Self::insert_address(&mut *tx, collection_id, &address).await?;

        tx.commit().await?;
        Ok(address)
    }

    async fn find_address(&self, collection_id: Uuid) -> Result<Option<Address>, AppError> {
        let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE collection_id = $1");
        let address = sqlx::query_as::<_, Address>(&sql)
            .bind(collection_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(address)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Dependentes primeiro: o schema não tem ON DELETE CASCADE.
        sqlx::query("DELETE FROM items WHERE collection_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM addresses WHERE collection_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Coleta"));
        }

        tx.commit().await?;
        Ok(())
    }
}
