//! Buildings repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::BuildingStore;
use crate::{
    error::{on_unique_violation, AppError, AppResult},
    models::{page_bounds, Building, BuildingQuery},
};

/// Escape `LIKE` metacharacters so the needle matches literally
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone)]
pub struct BuildingsRepository {
    pool: Pool<Postgres>,
}

impl BuildingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BuildingStore for BuildingsRepository {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM buildings WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn exists_by_name(&self, name: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM buildings WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn add(&self, building: &Building) -> AppResult<Building> {
        sqlx::query_as::<_, Building>("INSERT INTO buildings (id, name) VALUES ($1, $2) RETURNING *")
            .bind(building.id)
            .bind(&building.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                on_unique_violation(e, || {
                    AppError::Conflict(format!("Building {} already exists", building.name))
                })
            })
    }

    async fn get(&self, id: Uuid) -> AppResult<Building> {
        sqlx::query_as::<_, Building>("SELECT * FROM buildings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Building {} not found", id)))
    }

    async fn list(&self, query: &BuildingQuery) -> AppResult<(Vec<Building>, i64)> {
        let (limit, offset) = page_bounds(query.limit, query.offset);
        let pattern = query.name_contains.as_deref().map(|s| format!("%{}%", escape_like(s)));

        let where_clause = if pattern.is_some() {
            r"WHERE name ILIKE $1 ESCAPE '\'"
        } else {
            ""
        };

        let count_q = format!("SELECT COUNT(*) FROM buildings {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(ref p) = pattern { count_builder = count_builder.bind(p); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT * FROM buildings {} ORDER BY name LIMIT {} OFFSET {}",
            where_clause, limit, offset
        );
        let mut builder = sqlx::query_as::<_, Building>(&select_q);
        if let Some(ref p) = pattern { builder = builder.bind(p); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("Hall A"), "Hall A");
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }
}
