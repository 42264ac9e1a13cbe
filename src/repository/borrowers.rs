//! Borrowers repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::BorrowerStore;
use crate::{
    error::{on_unique_violation, AppError, AppResult},
    models::{page_bounds, Borrower, BorrowerQuery},
};

#[derive(Clone)]
pub struct BorrowersRepository {
    pool: Pool<Postgres>,
}

impl BorrowersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowerStore for BorrowersRepository {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM borrowers WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn add(&self, borrower: &Borrower) -> AppResult<Borrower> {
        sqlx::query_as::<_, Borrower>(
            r#"
            INSERT INTO borrowers (id, name, type, company, email, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(borrower.id)
        .bind(&borrower.name)
        .bind(&borrower.borrower_type)
        .bind(&borrower.company)
        .bind(&borrower.email)
        .bind(&borrower.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            on_unique_violation(e, || AppError::Conflict(format!("Borrower {} already exists", borrower.id)))
        })
    }

    async fn get(&self, id: Uuid) -> AppResult<Borrower> {
        sqlx::query_as::<_, Borrower>("SELECT * FROM borrowers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrower {} not found", id)))
    }

    async fn list(&self, query: &BorrowerQuery) -> AppResult<(Vec<Borrower>, i64)> {
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let where_clause = if query.borrower_type.is_some() {
            "WHERE type = $1"
        } else {
            ""
        };

        let count_q = format!("SELECT COUNT(*) FROM borrowers {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(ref t) = query.borrower_type { count_builder = count_builder.bind(t); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT * FROM borrowers {} ORDER BY name, id LIMIT {} OFFSET {}",
            where_clause, limit, offset
        );
        let mut builder = sqlx::query_as::<_, Borrower>(&select_q);
        if let Some(ref t) = query.borrower_type { builder = builder.bind(t); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows, total))
    }
}
