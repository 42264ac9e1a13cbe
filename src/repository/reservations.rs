//! Key reservations repository for database operations

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use super::ReservationStore;
use crate::{
    error::{on_unique_violation, AppError, AppResult},
    models::{page_bounds, Borrower, Key, Reservation, ReservationDetails, ReservationQuery},
};

const DETAILS_SELECT: &str = r#"
    SELECT r.*,
           k.room_number AS key_room_number, k.type AS key_type, k.building_id AS key_building_id,
           b.name AS borrower_name, b.type AS borrower_type, b.company AS borrower_company,
           b.email AS borrower_email, b.phone AS borrower_phone
    FROM key_reservations r
    JOIN keys k ON k.id = r.key_id
    LEFT JOIN borrowers b ON b.id = r.borrower_id
"#;

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn details_from_row(row: &PgRow) -> ReservationDetails {
    let borrower_id: Option<Uuid> = row.get("borrower_id");
    let borrower_name: Option<String> = row.get("borrower_name");

    let borrower = match (borrower_id, borrower_name) {
        (Some(id), Some(name)) => Some(Borrower {
            id,
            name,
            borrower_type: row.get("borrower_type"),
            company: row.get("borrower_company"),
            email: row.get("borrower_email"),
            phone: row.get("borrower_phone"),
        }),
        _ => None,
    };

    ReservationDetails {
        id: row.get("id"),
        key: Key {
            id: row.get("key_id"),
            building_id: row.get("key_building_id"),
            room_number: row.get("key_room_number"),
            key_type: row.get("key_type"),
        },
        borrower,
        building_id: row.get("building_id"),
        description: row.get("description"),
        collection_at: row.get("collection_at"),
        reservation_by: row.get("reservation_by"),
        return_at: row.get("return_at"),
        collected: row.get("collected"),
        returned: row.get("returned"),
        borrowed_key_id: row.get("borrowed_key_id"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl ReservationStore for ReservationsRepository {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM key_reservations WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn add(&self, reservation: &Reservation) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO key_reservations (
                id, key_id, borrower_id, building_id, description, collection_at,
                reservation_by, return_at, collected, returned, borrowed_key_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(reservation.id)
        .bind(&reservation.key_id)
        .bind(reservation.borrower_id)
        .bind(reservation.building_id)
        .bind(&reservation.description)
        .bind(reservation.collection_at)
        .bind(&reservation.reservation_by)
        .bind(reservation.return_at)
        .bind(reservation.collected)
        .bind(reservation.returned)
        .bind(reservation.borrowed_key_id)
        .bind(reservation.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            on_unique_violation(e, || {
                AppError::Conflict(format!("Reservation {} already exists", reservation.id))
            })
        })
    }

    async fn get(&self, id: Uuid) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM key_reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<ReservationDetails>, i64)> {
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.collected.is_some() {
            conditions.push(format!("r.collected = ${}", idx));
            idx += 1;
        }
        if query.returned.is_some() {
            conditions.push(format!("r.returned = ${}", idx));
            idx += 1;
        }
        if query.building_id.is_some() {
            conditions.push(format!("r.building_id = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_q = format!("SELECT COUNT(*) FROM key_reservations r {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(c) = query.collected { count_builder = count_builder.bind(c); }
        if let Some(r) = query.returned { count_builder = count_builder.bind(r); }
        if let Some(bid) = query.building_id { count_builder = count_builder.bind(bid); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "{} {} ORDER BY r.created_at DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT, where_clause, limit, offset
        );
        let mut builder = sqlx::query(&select_q);
        if let Some(c) = query.collected { builder = builder.bind(c); }
        if let Some(r) = query.returned { builder = builder.bind(r); }
        if let Some(bid) = query.building_id { builder = builder.bind(bid); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows.iter().map(details_from_row).collect(), total))
    }

    async fn find_by_borrowed_key(&self, borrowed_key_id: Uuid) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM key_reservations WHERE borrowed_key_id = $1 LIMIT 1",
        )
        .bind(borrowed_key_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    async fn find_open_for_key(&self, key_id: &str) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM key_reservations
            WHERE key_id = $1 AND NOT collected
            ORDER BY collection_at
            LIMIT 1
            "#,
        )
        .bind(key_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    async fn mark_collected(&self, id: Uuid, borrowed_key_id: Uuid) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE key_reservations SET collected = TRUE, borrowed_key_id = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(borrowed_key_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    async fn mark_returned(&self, id: Uuid) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            "UPDATE key_reservations SET returned = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    async fn delete(&self, id: Uuid) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("DELETE FROM key_reservations WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }
}
