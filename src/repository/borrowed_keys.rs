//! Borrowed keys repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use super::BorrowedKeyStore;
use crate::{
    error::{AppError, AppResult},
    models::{page_bounds, BorrowedKey, BorrowedKeyDetails, BorrowedKeyQuery, Borrower, Key},
};

/// Partial unique index allowing one active borrow per key
const ACTIVE_KEY_INDEX: &str = "borrowed_keys_active_key_idx";

const DETAILS_SELECT: &str = r#"
    SELECT bk.*,
           k.room_number AS key_room_number, k.type AS key_type, k.building_id AS key_building_id,
           b.name AS borrower_name, b.type AS borrower_type, b.company AS borrower_company,
           b.email AS borrower_email, b.phone AS borrower_phone
    FROM borrowed_keys bk
    JOIN keys k ON k.id = bk.key_id
    JOIN borrowers b ON b.id = bk.borrower_id
"#;

#[derive(Clone)]
pub struct BorrowedKeysRepository {
    pool: Pool<Postgres>,
}

impl BorrowedKeysRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn details_from_row(row: &PgRow) -> BorrowedKeyDetails {
    let key_id: String = row.get("key_id");
    let borrower_id: Uuid = row.get("borrower_id");

    BorrowedKeyDetails {
        id: row.get("id"),
        key: Key {
            id: key_id,
            building_id: row.get("key_building_id"),
            room_number: row.get("key_room_number"),
            key_type: row.get("key_type"),
        },
        borrower: Borrower {
            id: borrower_id,
            name: row.get("borrower_name"),
            borrower_type: row.get("borrower_type"),
            company: row.get("borrower_company"),
            email: row.get("borrower_email"),
            phone: row.get("borrower_phone"),
        },
        building_id: row.get("building_id"),
        image_filename: row.get("image_filename"),
        signature_filename: row.get("signature_filename"),
        borrowed: row.get("borrowed"),
        borrowed_at: row.get("borrowed_at"),
        returned_at: row.get("returned_at"),
    }
}

#[async_trait]
impl BorrowedKeyStore for BorrowedKeysRepository {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM borrowed_keys WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn add(&self, borrowed_key: &BorrowedKey) -> AppResult<BorrowedKey> {
        sqlx::query_as::<_, BorrowedKey>(
            r#"
            INSERT INTO borrowed_keys (
                id, key_id, borrower_id, building_id, image_filename,
                signature_filename, borrowed, borrowed_at, returned_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(borrowed_key.id)
        .bind(&borrowed_key.key_id)
        .bind(borrowed_key.borrower_id)
        .bind(borrowed_key.building_id)
        .bind(&borrowed_key.image_filename)
        .bind(&borrowed_key.signature_filename)
        .bind(borrowed_key.borrowed)
        .bind(borrowed_key.borrowed_at)
        .bind(borrowed_key.returned_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let constraint = e
                .as_database_error()
                .filter(|db| db.is_unique_violation())
                .map(|db| db.constraint().unwrap_or_default().to_string());

            match constraint.as_deref() {
                Some(ACTIVE_KEY_INDEX) => AppError::AlreadyBorrowed(format!(
                    "Key {} is already borrowed",
                    borrowed_key.key_id
                )),
                Some(_) => AppError::Conflict(format!(
                    "Borrowed key {} already exists",
                    borrowed_key.id
                )),
                None => AppError::Database(e),
            }
        })
    }

    async fn get(&self, id: Uuid) -> AppResult<BorrowedKey> {
        sqlx::query_as::<_, BorrowedKey>("SELECT * FROM borrowed_keys WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowed key {} not found", id)))
    }

    async fn get_details(&self, id: Uuid) -> AppResult<BorrowedKeyDetails> {
        let query = format!("{} WHERE bk.id = $1", DETAILS_SELECT);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowed key {} not found", id)))?;

        Ok(details_from_row(&row))
    }

    async fn list(&self, query: &BorrowedKeyQuery) -> AppResult<(Vec<BorrowedKeyDetails>, i64)> {
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.borrowed.is_some() {
            conditions.push(format!("bk.borrowed = ${}", idx));
            idx += 1;
        }
        if query.building_id.is_some() {
            conditions.push(format!("bk.building_id = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Count total
        let count_q = format!("SELECT COUNT(*) FROM borrowed_keys bk {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(b) = query.borrowed { count_builder = count_builder.bind(b); }
        if let Some(bid) = query.building_id { count_builder = count_builder.bind(bid); }
        let total = count_builder.fetch_one(&self.pool).await?;

        // Fetch rows
        let select_q = format!(
            "{} {} ORDER BY bk.borrowed_at DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT, where_clause, limit, offset
        );
        let mut builder = sqlx::query(&select_q);
        if let Some(b) = query.borrowed { builder = builder.bind(b); }
        if let Some(bid) = query.building_id { builder = builder.bind(bid); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows.iter().map(details_from_row).collect(), total))
    }

    async fn is_borrowed(&self, key_id: &str) -> AppResult<bool> {
        let borrowed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrowed_keys WHERE key_id = $1 AND borrowed)",
        )
        .bind(key_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(borrowed)
    }

    async fn mark_returned(&self, id: Uuid, returned_at: DateTime<Utc>) -> AppResult<BorrowedKey> {
        let returned = sqlx::query_as::<_, BorrowedKey>(
            "UPDATE borrowed_keys SET borrowed = FALSE, returned_at = $1 WHERE id = $2 AND borrowed RETURNING *",
        )
        .bind(returned_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(borrowed_key) = returned {
            return Ok(borrowed_key);
        }
        if self.exists(id).await? {
            return Err(AppError::AlreadyReturned(format!("Borrow {} was already returned", id)));
        }
        Err(AppError::NotFound(format!("Borrowed key {} not found", id)))
    }
}
