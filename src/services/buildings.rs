//! Building service

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Building, BuildingQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct BuildingsService {
    repository: Repository,
}

impl BuildingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create a building, failing if the name is taken
    pub async fn create(&self, name: &str) -> AppResult<Building> {
        if self.repository.buildings.exists_by_name(name).await? {
            return Err(AppError::Conflict(format!("Building {} already exists", name)));
        }
        let building = self.repository.buildings.add(&Building::new(name)).await?;
        tracing::info!("Created building {} ({})", building.name, building.id);
        Ok(building)
    }

    /// Return the building with this name, creating it on first reference
    pub async fn get_or_create(&self, name: &str) -> AppResult<Building> {
        let building = Building::new(name);
        if self.repository.buildings.exists(building.id).await? {
            return self.repository.buildings.get(building.id).await;
        }
        self.repository.buildings.add(&building).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Building> {
        self.repository.buildings.get(id).await
    }

    pub async fn list(&self, query: &BuildingQuery) -> AppResult<(Vec<Building>, i64)> {
        self.repository.buildings.list(query).await
    }
}
