//! Keys repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::KeyStore;
use crate::{
    error::{on_unique_violation, AppError, AppResult},
    models::{page_bounds, Key, KeyQuery},
};

#[derive(Clone)]
pub struct KeysRepository {
    pool: Pool<Postgres>,
}

impl KeysRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for KeysRepository {
    async fn exists(&self, id: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM keys WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn add(&self, key: &Key) -> AppResult<Key> {
        sqlx::query_as::<_, Key>(
            r#"
            INSERT INTO keys (id, building_id, room_number, type)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&key.id)
        .bind(key.building_id)
        .bind(&key.room_number)
        .bind(&key.key_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| on_unique_violation(e, || AppError::Conflict(format!("Key {} already exists", key.id))))
    }

    async fn get(&self, id: &str) -> AppResult<Key> {
        sqlx::query_as::<_, Key>("SELECT * FROM keys WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Key {} not found", id)))
    }

    async fn list(&self, query: &KeyQuery) -> AppResult<(Vec<Key>, i64)> {
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let where_clause = if query.building_id.is_some() {
            "WHERE building_id = $1"
        } else {
            ""
        };

        let count_q = format!("SELECT COUNT(*) FROM keys {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(building_id) = query.building_id { count_builder = count_builder.bind(building_id); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT * FROM keys {} ORDER BY room_number, type LIMIT {} OFFSET {}",
            where_clause, limit, offset
        );
        let mut builder = sqlx::query_as::<_, Key>(&select_q);
        if let Some(building_id) = query.building_id { builder = builder.bind(building_id); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows, total))
    }
}
